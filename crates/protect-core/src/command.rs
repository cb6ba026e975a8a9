//! Typed command envelope.
//!
//! Wire form is `{"CMD": "SET", "ID": .., "DEFENSE": .., "TTL": ..}` or
//! `{"CMD": "PULL"}`. Shape errors come from serde; range errors are
//! checked once here so the registry only ever sees valid input.

use crate::errors::RegistryError;
use crate::model::{DefenseLevel, ProtectionId, Ttl};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetCommand {
    pub id: ProtectionId,
    pub defense: DefenseLevel,
    pub ttl: Ttl,
}

impl SetCommand {
    pub fn new(id: i64, defense: i64, ttl: i64) -> Result<Self, RegistryError> {
        Ok(Self {
            id: ProtectionId(id),
            defense: DefenseLevel::new(defense)?,
            ttl: Ttl::from_secs(ttl)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Set(SetCommand),
    Pull,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "CMD")]
enum RawCommand {
    #[serde(rename = "SET")]
    Set {
        #[serde(rename = "ID")]
        id: i64,
        #[serde(rename = "DEFENSE")]
        defense: i64,
        #[serde(rename = "TTL")]
        ttl: i64,
    },
    #[serde(rename = "PULL")]
    Pull,
}

impl TryFrom<RawCommand> for Command {
    type Error = RegistryError;

    fn try_from(raw: RawCommand) -> Result<Self, Self::Error> {
        match raw {
            RawCommand::Set { id, defense, ttl } => {
                SetCommand::new(id, defense, ttl).map(Command::Set)
            }
            RawCommand::Pull => Ok(Command::Pull),
        }
    }
}

impl Command {
    /// Parse and validate one JSON envelope.
    pub fn parse(json: &str) -> Result<Self, RegistryError> {
        let raw: RawCommand = serde_json::from_str(json)
            .map_err(|e| RegistryError::invalid_input("$", e.to_string()))?;
        Command::try_from(raw)
    }
}
