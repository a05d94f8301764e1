//! SMS message types
//!
//! Payload encoding (character sets, PDU construction) is the native
//! driver's concern; these types carry plain text only.

/// An outbound message handed to the native driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsSubmission {
    /// Destination phone number
    pub number: String,
    /// Message text
    pub text: String,
}

impl SmsSubmission {
    pub fn new(number: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            text: text.into(),
        }
    }
}

/// A message read from the modem's storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedSms {
    /// Storage location within the folder
    pub location: i32,
    /// Storage folder index
    pub folder: i32,
    /// Sender phone number
    pub number: String,
    /// Message text
    pub text: String,
}
