pub mod chatdb;
pub mod db;
pub mod ledgerdb;
pub mod notificationdb;
pub mod taskdb;
pub mod userdb;
pub mod verificationdb;
