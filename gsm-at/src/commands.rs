//! Wire-level AT command set
//!
//! These literals must match the modem's expectations exactly, including
//! the trailing carriage-return/linefeed.

/// Successful command terminator
pub const TERM_OK: &str = "OK\r\n";

/// Failed command terminator
pub const TERM_ERROR: &str = "ERROR\r\n";

/// Select the GSM character set
pub const CMD_CHARSET_GSM: &str = "AT+CSCS=\"GSM\"\r\n";

/// Submit a USSD request for `code` (e.g. `*888#`)
pub fn cmd_ussd_query(code: &str) -> String {
    format!("AT+CUSD=1,\"{}\",15\r\n", code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ussd_query_literal() {
        assert_eq!(cmd_ussd_query("*888#"), "AT+CUSD=1,\"*888#\",15\r\n");
    }
}
