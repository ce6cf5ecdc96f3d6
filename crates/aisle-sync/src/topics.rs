//! # Typed Topics
//!
//! Each hardware key gets a [`Topic`] that owns its name and its wire
//! encoding. The hardware is loose about types (the mode switch may write
//! `1` or `"1"`, the scale writes strings), so decoding is forgiving and
//! encoding is exact.
//!
//! | Topic | Key | Engine type | Wire |
//! |---|---|---|---|
//! | [`ModeTopic`] | `Modes` | `i64` | number or numeric string |
//! | [`ProductNameTopic`] | `Product_Name` | `String` | string |
//! | [`ExpectedWeightTopic`] | `Product_Weight` | `f64` grams | `"500.00"` |
//! | [`WeightTopic`] | `Weight` | `f64` grams | string or number |
//! | [`StatusTopic`] | `Direction` | `char` | one-character string |

use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

use aisle_core::weight::{format_grams, parse_weight_reading};

use crate::channel::SharedChannel;
use crate::error::SyncResult;

/// A named, typed key on the shared channel.
pub trait Topic: Send + Sync + 'static {
    type Value: Send;

    /// Key relative to the channel root.
    const KEY: &'static str;

    fn encode(value: &Self::Value) -> Value;

    /// `None` for null or a value that doesn't fit the type.
    fn decode(raw: &Value) -> Option<Self::Value>;
}

// =============================================================================
// Topic Definitions
// =============================================================================

/// Command selector written by the mode switch.
pub struct ModeTopic;

impl Topic for ModeTopic {
    type Value = i64;
    const KEY: &'static str = "Modes";

    fn encode(value: &i64) -> Value {
        Value::from(*value)
    }

    /// Whole numbers only: `1`, `1.0` and `"1"` select a mode, `1.9` doesn't.
    fn decode(raw: &Value) -> Option<i64> {
        match raw {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole_number)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(whole_number))
            }
            _ => None,
        }
    }
}

fn whole_number(f: f64) -> Option<i64> {
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.is_finite() && f.fract() == 0.0 && in_range).then_some(f as i64)
}

/// Product title shown on (and entered from) the basket display.
pub struct ProductNameTopic;

impl Topic for ProductNameTopic {
    type Value = String;
    const KEY: &'static str = "Product_Name";

    fn encode(value: &String) -> Value {
        Value::String(value.clone())
    }

    fn decode(raw: &Value) -> Option<String> {
        match raw {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Grams the basket should weigh, published after every cart change.
pub struct ExpectedWeightTopic;

impl Topic for ExpectedWeightTopic {
    type Value = f64;
    const KEY: &'static str = "Product_Weight";

    fn encode(value: &f64) -> Value {
        Value::String(format_grams(*value))
    }

    fn decode(raw: &Value) -> Option<f64> {
        decode_grams(raw)
    }
}

/// Grams the scale measured. Written only by the scale.
pub struct WeightTopic;

impl Topic for WeightTopic {
    type Value = f64;
    const KEY: &'static str = "Weight";

    fn encode(value: &f64) -> Value {
        Value::String(format_grams(*value))
    }

    fn decode(raw: &Value) -> Option<f64> {
        decode_grams(raw)
    }
}

/// Single-character feedback and drive commands.
pub struct StatusTopic;

impl Topic for StatusTopic {
    type Value = char;
    const KEY: &'static str = "Direction";

    fn encode(value: &char) -> Value {
        Value::String(value.to_string())
    }

    fn decode(raw: &Value) -> Option<char> {
        raw.as_str().and_then(|s| s.trim().chars().next())
    }
}

fn decode_grams(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => Some(parse_weight_reading(s)),
        _ => None,
    }
}

// =============================================================================
// Topic Bus
// =============================================================================

/// Typed access to a [`SharedChannel`] under one root.
#[derive(Clone)]
pub struct TopicBus {
    channel: Arc<dyn SharedChannel>,
    root: String,
}

impl TopicBus {
    pub fn new(channel: Arc<dyn SharedChannel>, root: impl Into<String>) -> Self {
        TopicBus {
            channel,
            root: root.into().trim_end_matches('/').to_string(),
        }
    }

    /// Full channel key for `T`.
    pub fn key<T: Topic>(&self) -> String {
        self.raw_key(T::KEY)
    }

    /// Full channel key for an arbitrary name under the root.
    pub fn raw_key(&self, name: &str) -> String {
        if self.root.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.root, name)
        }
    }

    pub async fn read<T: Topic>(&self) -> SyncResult<Option<T::Value>> {
        let raw = self.channel.read(&self.key::<T>()).await?;
        Ok(raw.as_ref().and_then(T::decode))
    }

    pub async fn write<T: Topic>(&self, value: &T::Value) -> SyncResult<()> {
        self.channel.write(&self.key::<T>(), T::encode(value)).await
    }

    pub fn subscribe<T: Topic>(&self) -> SyncResult<TopicSubscription<T>> {
        Ok(TopicSubscription {
            receiver: self.channel.subscribe(&self.key::<T>())?,
            _topic: PhantomData,
        })
    }

    pub fn channel(&self) -> &Arc<dyn SharedChannel> {
        &self.channel
    }

    pub fn root(&self) -> &str {
        &self.root
    }
}

/// One delivery from a [`TopicSubscription`].
#[derive(Debug, PartialEq)]
pub enum TopicEvent<V> {
    /// A write happened. `None` when the written value didn't decode.
    Value(Option<V>),
    /// Updates were dropped; re-read the current value.
    Lagged(u64),
    Closed,
}

pub struct TopicSubscription<T: Topic> {
    receiver: broadcast::Receiver<Value>,
    _topic: PhantomData<T>,
}

impl<T: Topic> TopicSubscription<T> {
    pub async fn recv(&mut self) -> TopicEvent<T::Value> {
        match self.receiver.recv().await {
            Ok(raw) => TopicEvent::Value(T::decode(&raw)),
            Err(RecvError::Lagged(skipped)) => TopicEvent::Lagged(skipped),
            Err(RecvError::Closed) => TopicEvent::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::InMemoryChannel;
    use serde_json::json;

    #[test]
    fn test_mode_decoding() {
        assert_eq!(ModeTopic::decode(&json!(2)), Some(2));
        assert_eq!(ModeTopic::decode(&json!("3")), Some(3));
        assert_eq!(ModeTopic::decode(&json!(" 4 ")), Some(4));
        assert_eq!(ModeTopic::decode(&json!(1.0)), Some(1));
        assert_eq!(ModeTopic::decode(&json!("2.0")), Some(2));
        assert_eq!(ModeTopic::decode(&json!(1.9)), None);
        assert_eq!(ModeTopic::decode(&json!("1.9")), None);
        assert_eq!(ModeTopic::decode(&json!(1e300)), None);
        assert_eq!(ModeTopic::decode(&json!("")), None);
        assert_eq!(ModeTopic::decode(&json!("add")), None);
        assert_eq!(ModeTopic::decode(&Value::Null), None);
    }

    #[test]
    fn test_weight_decoding() {
        assert_eq!(WeightTopic::decode(&json!("497")), Some(497.0));
        assert_eq!(WeightTopic::decode(&json!(497.5)), Some(497.5));
        assert_eq!(WeightTopic::decode(&json!("garbage")), Some(0.0));
        assert_eq!(WeightTopic::decode(&Value::Null), None);
    }

    #[test]
    fn test_expected_weight_encoding() {
        assert_eq!(ExpectedWeightTopic::encode(&500.0), json!("500.00"));
        assert_eq!(ExpectedWeightTopic::encode(&0.0), json!("0.00"));
        assert_eq!(StatusTopic::encode(&'S'), json!("S"));
        assert_eq!(StatusTopic::decode(&json!("E")), Some('E'));
    }

    #[tokio::test]
    async fn test_bus_prefixes_root() {
        let channel = Arc::new(InMemoryChannel::new());
        let bus = TopicBus::new(channel.clone(), "Shopping_Basket/");

        assert_eq!(bus.key::<ModeTopic>(), "Shopping_Basket/Modes");
        bus.write::<ExpectedWeightTopic>(&1000.0).await.unwrap();
        assert_eq!(
            channel.read("Shopping_Basket/Product_Weight").await.unwrap(),
            Some(json!("1000.00"))
        );

        let flat = TopicBus::new(channel, "");
        assert_eq!(flat.key::<WeightTopic>(), "Weight");
    }

    #[tokio::test]
    async fn test_subscription_decodes() {
        let channel = Arc::new(InMemoryChannel::new());
        let bus = TopicBus::new(channel.clone(), "Shopping_Basket");
        let mut modes = bus.subscribe::<ModeTopic>().unwrap();

        channel
            .write("Shopping_Basket/Modes", json!("2"))
            .await
            .unwrap();
        channel
            .write("Shopping_Basket/Modes", json!({"bad": true}))
            .await
            .unwrap();

        assert_eq!(modes.recv().await, TopicEvent::Value(Some(2)));
        assert_eq!(modes.recv().await, TopicEvent::Value(None));
    }
}
