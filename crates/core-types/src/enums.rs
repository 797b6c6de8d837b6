use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Generates the text codec shared by every persisted enum: `as_str`, `Display` and `FromStr`.
/// The codes are the same strings serde uses, so rows and JSON payloads agree.
macro_rules! text_codec {
    ($name:ident { $($variant:ident => $code:literal),+ $(,)? }) => {
        impl $name {
            /// The canonical text code for this value.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $code,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($code => Ok($name::$variant),)+
                    other => Err(CoreError::InvalidInput(
                        stringify!($name).to_string(),
                        other.to_string(),
                    )),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Market,
    Limit,
    NetCredit,
    NetDebit,
}

text_codec!(OrderType {
    Market => "MARKET",
    Limit => "LIMIT",
    NetCredit => "NET_CREDIT",
    NetDebit => "NET_DEBIT",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Queued,
    Accepted,
    Working,
    PendingCancel,
    Filled,
    Canceled,
    Rejected,
    Expired,
}

text_codec!(OrderStatus {
    Queued => "QUEUED",
    Accepted => "ACCEPTED",
    Working => "WORKING",
    PendingCancel => "PENDING_CANCEL",
    Filled => "FILLED",
    Canceled => "CANCELED",
    Rejected => "REJECTED",
    Expired => "EXPIRED",
});

impl OrderStatus {
    /// Every status an order can still leave.
    pub const ACTIVE: [OrderStatus; 4] = [
        OrderStatus::Queued,
        OrderStatus::Accepted,
        OrderStatus::Working,
        OrderStatus::PendingCancel,
    ];

    /// Returns `true` while the order may still change at the broker.
    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderInstruction {
    Buy,
    Sell,
    BuyToOpen,
    SellToOpen,
    BuyToClose,
    SellToClose,
}

text_codec!(OrderInstruction {
    Buy => "BUY",
    Sell => "SELL",
    BuyToOpen => "BUY_TO_OPEN",
    SellToOpen => "SELL_TO_OPEN",
    BuyToClose => "BUY_TO_CLOSE",
    SellToClose => "SELL_TO_CLOSE",
});

impl OrderInstruction {
    /// Every instruction that opens (or adds to) a position.
    pub const OPENING: [OrderInstruction; 3] = [
        OrderInstruction::Buy,
        OrderInstruction::BuyToOpen,
        OrderInstruction::SellToOpen,
    ];

    /// Returns `true` for instructions that open (or add to) a position.
    pub fn is_opening(&self) -> bool {
        Self::OPENING.contains(self)
    }

    /// Returns `true` if the instruction buys, i.e. increases the long side.
    pub fn is_buy(&self) -> bool {
        matches!(
            self,
            OrderInstruction::Buy | OrderInstruction::BuyToOpen | OrderInstruction::BuyToClose
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetType {
    Equity,
    Option,
    Index,
}

text_codec!(AssetType {
    Equity => "EQUITY",
    Option => "OPTION",
    Index => "INDEX",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PutCall {
    Put,
    Call,
}

text_codec!(PutCall {
    Put => "PUT",
    Call => "CALL",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderDuration {
    Day,
    GoodTillCancel,
    FillOrKill,
}

text_codec!(OrderDuration {
    Day => "DAY",
    GoodTillCancel => "GOOD_TILL_CANCEL",
    FillOrKill => "FILL_OR_KILL",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSession {
    Normal,
    Am,
    Pm,
    Seamless,
}

text_codec!(OrderSession {
    Normal => "NORMAL",
    Am => "AM",
    Pm => "PM",
    Seamless => "SEAMLESS",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketType {
    Equity,
    Option,
    Future,
}

text_codec!(MarketType {
    Equity => "EQUITY",
    Option => "OPTION",
    Future => "FUTURE",
});

/// Identifies which strategy implementation a configured strategy uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    QuoteMonitor,
    OrderMonitor,
}

text_codec!(StrategyKind {
    QuoteMonitor => "quote_monitor",
    OrderMonitor => "order_monitor",
});

/// Identifies which broker implementation a configured broker uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerKind {
    Paper,
}

text_codec!(BrokerKind {
    Paper => "paper",
});
