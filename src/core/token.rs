use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A tradable asset on some chain.
///
/// Equality and hashing go through [`Token::identity`], so a bridged or wrapped
/// representation that carries the same explicit `token_id` is interchangeable
/// with the original inside a liquidity graph.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Token {
    pub chain_id: u64,
    pub address: String,
    pub decimals: u8,
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
}

impl Token {
    pub fn new(chain_id: u64, address: &str, decimals: u8, symbol: &str) -> Self {
        Self {
            chain_id,
            address: address.to_string(),
            decimals,
            symbol: symbol.to_string(),
            token_id: None,
        }
    }

    // Tokens sharing an explicit id are treated as the same economic asset
    pub fn with_token_id(mut self, token_id: &str) -> Self {
        self.token_id = Some(token_id.to_string());
        self
    }

    pub fn identity(&self) -> String {
        match &self.token_id {
            Some(id) => id.clone(),
            None => format!("{}_{}", self.address.to_lowercase(), self.chain_id),
        }
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.symbol, self.identity())
    }
}
