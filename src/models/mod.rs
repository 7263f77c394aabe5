pub mod chatmodels;
pub mod ledgermodel;
pub mod notificationmodel;
pub mod taskmodel;
pub mod usermodel;
pub mod verificationmodels;
