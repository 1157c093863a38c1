//! Sale result decoding and voucher formatting.

use serde::Serialize;
use ux300_frame::DecodedMessage;

/// Width of one printed voucher line.
pub const VOUCHER_LINE_WIDTH: usize = 40;

// Field positions in `0210` and `0260` messages.
const RESPONSE_CODE: usize = 1;
const COMMERCE_CODE: usize = 2;
const TERMINAL_ID: usize = 3;
const TICKET: usize = 4;
const AUTHORIZATION_CODE: usize = 5;
const AMOUNT: usize = 6;
const CARD_NUMBER: usize = 7;
const CARD_TYPE: usize = 8;
const ACCOUNTING_DATE: usize = 9;
const ACCOUNT_NUMBER: usize = 10;
const CARD_ABBREVIATION: usize = 11;
const DATE: usize = 13;
const TIME: usize = 14;
/// Position of the voucher text in `0210` and `0260` messages.
pub const VOUCHER: usize = 15;
/// Position of the settlement report in `0510` messages.
pub const CLOSE_REPORT: usize = 4;

/// Card-type specific detail of a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CardDetail {
    Debit {
        accounting_date: String,
        account_number: String,
    },
    Credit {
        card_abbreviation: String,
    },
}

/// Structured result of an approved sale.
///
/// Missing trailing fields decode as empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionInfo {
    pub response_code: String,
    pub commerce_code: String,
    pub terminal_id: String,
    pub ticket: String,
    pub authorization_code: String,
    pub amount: String,
    /// Last digits of the card number as printed by the terminal.
    pub card_number: String,
    /// `DB`, `CR` or a brand code such as `VI`.
    pub card_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<CardDetail>,
    pub date: String,
    pub time: String,
}

impl TransactionInfo {
    /// Decode the transaction fields of a `0210` message.
    pub fn from_message(message: &DecodedMessage) -> Self {
        let field = |index| message.field(index).unwrap_or_default().to_string();
        let card_type = field(CARD_TYPE);
        let card = match card_type.as_str() {
            "DB" => Some(CardDetail::Debit {
                accounting_date: field(ACCOUNTING_DATE),
                account_number: field(ACCOUNT_NUMBER),
            }),
            "CR" => Some(CardDetail::Credit {
                card_abbreviation: field(CARD_ABBREVIATION),
            }),
            _ => None,
        };

        Self {
            response_code: field(RESPONSE_CODE),
            commerce_code: field(COMMERCE_CODE),
            terminal_id: field(TERMINAL_ID),
            ticket: field(TICKET),
            authorization_code: field(AUTHORIZATION_CODE),
            amount: field(AMOUNT),
            card_number: field(CARD_NUMBER),
            card_type,
            card,
            date: field(DATE),
            time: field(TIME),
        }
    }

    /// The amount as an integer, when it is one.
    pub fn amount_value(&self) -> Option<u64> {
        self.amount.trim().parse().ok()
    }
}

/// Split `text` into consecutive lines of `width` characters.
///
/// The last line holds the remainder. Empty text yields no lines.
pub fn voucher_lines(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(width)
        .map(|line| line.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(body: &str) -> DecodedMessage {
        DecodedMessage::from_fields(body.split('|').map(str::to_string).collect())
    }

    #[test]
    fn brand_card_has_no_detail() {
        let msg = message("0210|00|599|001|T1|AUTH1|1000|4111|VI|||||20240101|1200|VOUCHER");
        let info = TransactionInfo::from_message(&msg);
        assert_eq!(info.response_code, "00");
        assert_eq!(info.commerce_code, "599");
        assert_eq!(info.terminal_id, "001");
        assert_eq!(info.ticket, "T1");
        assert_eq!(info.authorization_code, "AUTH1");
        assert_eq!(info.amount_value(), Some(1000));
        assert_eq!(info.card_number, "4111");
        assert_eq!(info.card_type, "VI");
        assert_eq!(info.card, None);
        assert_eq!(info.date, "20240101");
        assert_eq!(info.time, "1200");
    }

    #[test]
    fn debit_card_detail() {
        let msg = message("0210|00|599|001|T2|A|500|1234|DB|20240102|000123|||20240102|0930|V");
        let info = TransactionInfo::from_message(&msg);
        assert_eq!(
            info.card,
            Some(CardDetail::Debit {
                accounting_date: "20240102".to_string(),
                account_number: "000123".to_string(),
            })
        );
    }

    #[test]
    fn credit_card_detail() {
        let msg = message("0210|00|599|001|T3|A|500|1234|CR|||VISA||20240102|0930|V");
        let info = TransactionInfo::from_message(&msg);
        assert_eq!(
            info.card,
            Some(CardDetail::Credit {
                card_abbreviation: "VISA".to_string(),
            })
        );
    }

    #[test]
    fn short_message_decodes_to_empty_fields() {
        let info = TransactionInfo::from_message(&message("0210|00"));
        assert_eq!(info.response_code, "00");
        assert_eq!(info.ticket, "");
        assert_eq!(info.amount_value(), None);
        assert_eq!(info.card, None);
    }

    #[test]
    fn voucher_splits_into_fixed_width_lines() {
        let text: String = ('a'..='z').cycle().take(85).collect();
        let lines = voucher_lines(&text, VOUCHER_LINE_WIDTH);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].len(), 40);
        assert_eq!(lines[1].len(), 40);
        assert_eq!(lines[2].len(), 5);
        assert_eq!(lines.concat(), text);
    }

    #[test]
    fn voucher_edge_lengths() {
        assert!(voucher_lines("", VOUCHER_LINE_WIDTH).is_empty());
        assert_eq!(voucher_lines(&"x".repeat(40), 40).len(), 1);
        assert_eq!(voucher_lines(&"x".repeat(41), 40).len(), 2);
    }

    #[test]
    fn serializes_card_detail_inline() {
        let msg = message("0210|00|599|001|T3|A|500|1234|CR|||VISA||20240102|0930|V");
        let json = serde_json::to_value(TransactionInfo::from_message(&msg)).unwrap();
        assert_eq!(json["card"]["kind"], "credit");
        assert_eq!(json["card"]["card_abbreviation"], "VISA");
    }
}
