// BSD 2-Clause License
//
// Copyright (c) 2019, 2020 Alasdair Armstrong
//
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
// 1. Redistributions of source code must retain the above copyright
// notice, this list of conditions and the following disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright
// notice, this list of conditions and the following disclaimer in the
// documentation and/or other materials provided with the distribution.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS
// "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT
// LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR
// A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT
// HOLDER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT
// LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE,
// DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY
// THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT
// (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! This module loads a TOML file containing the configuration for a
//! replay session.

use std::fs::File;
use std::io::prelude::*;
use std::path::Path;
use std::str::FromStr;
use toml::Value;

use crate::ir::Instr;

/// What to do with loads whose value was already resolved by the
/// recording side, see [`ReplayConfig::is_tagged`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TaggedLoads {
    /// Consume the load's trace entry but bind nothing.
    Skip,
    /// Treat the load as unsupported and stop.
    Abort,
}

impl FromStr for TaggedLoads {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip" => Ok(TaggedLoads::Skip),
            "abort" => Ok(TaggedLoads::Abort),
            _ => Err(format!("Tagged load policy must be \"skip\" or \"abort\", not \"{}\"", s)),
        }
    }
}

fn get_table_value(config: &Value, table: &str, key: &str) -> Result<u64, String> {
    config
        .get(table)
        .and_then(|table| table.get(key).and_then(|value| value.as_str()))
        .ok_or_else(|| format!("No {}.{} found in config", table, key))
        .and_then(|value| {
            if value.len() >= 2 && &value[0..2] == "0x" {
                u64::from_str_radix(&value[2..], 16)
            } else {
                u64::from_str_radix(value, 10)
            }
            .map_err(|e| format!("Could not parse {} as a 64-bit unsigned integer in {}.{}: {}", value, table, key, e))
        })
}

fn get_table_string(config: &Value, table: &str, key: &str) -> Result<String, String> {
    config
        .get(table)
        .and_then(|table| table.get(key).and_then(|value| value.as_str()))
        .ok_or_else(|| format!("No {}.{} found in config", table, key))
        .map(|value| value.to_string())
}

fn get_table_bool(config: &Value, table: &str, key: &str) -> Result<bool, String> {
    config
        .get(table)
        .and_then(|table| table.get(key).and_then(|value| value.as_bool()))
        .ok_or_else(|| format!("No boolean {}.{} found in config", table, key))
}

#[derive(Clone, Debug)]
pub struct ReplayConfig {
    /// Calls to functions with this prefix are instrumentation and
    /// are ignored
    pub record_prefix: String,
    /// Whether the entry block of each function has its own
    /// basic-block trace entry
    pub entry_block_marker: bool,
    pub tagged_loads: TaggedLoads,
    /// The metadata key marking a load as already resolved
    pub tag_metadata: String,
    /// The first operand the metadata node must have
    pub tag: String,
    /// The value read from memory that was never written
    pub unhandled: u64,
    /// The name given to the environment pointer variable
    pub env_name: String,
}

impl ReplayConfig {
    pub fn parse(contents: &str) -> Result<Self, String> {
        let config = match contents.parse::<Value>() {
            Ok(config) => config,
            Err(e) => return Err(format!("Error when parsing configuration: {}", e)),
        };

        Ok(ReplayConfig {
            record_prefix: get_table_string(&config, "calls", "record_prefix")?,
            entry_block_marker: get_table_bool(&config, "trace", "entry_block_marker")?,
            tagged_loads: get_table_string(&config, "loads", "tagged")?.parse()?,
            tag_metadata: get_table_string(&config, "loads", "metadata")?,
            tag: get_table_string(&config, "loads", "tag")?,
            unhandled: get_table_value(&config, "memory", "unhandled")?,
            env_name: get_table_string(&config, "symbols", "env")?,
        })
    }

    /// Use a default configuration when none is specified
    pub fn new() -> Result<Self, String> {
        Self::parse(include_str!("../default_config.toml"))
    }

    /// Load the configuration from a TOML file.
    pub fn from_file<P>(path: P) -> Result<Self, String>
    where
        P: AsRef<Path>,
    {
        let mut contents = String::new();
        match File::open(&path) {
            Ok(mut handle) => match handle.read_to_string(&mut contents) {
                Ok(_) => (),
                Err(e) => return Err(format!("Unexpected failure while reading config: {}", e)),
            },
            Err(e) => return Err(format!("Error when loading config '{}': {}", path.as_ref().display(), e)),
        };
        Self::parse(&contents)
    }

    pub fn is_record_call(&self, callee: &str) -> bool {
        callee.starts_with(&self.record_prefix)
    }

    /// A load is tagged if it carries the configured metadata node
    /// and that node's first operand is the configured tag.
    pub fn is_tagged(&self, instr: &Instr) -> bool {
        match instr.metadata(&self.tag_metadata) {
            Some(operands) => operands.first().map(|op| op == &self.tag).unwrap_or(false),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Opcode, Operand};

    #[test]
    fn default_config() {
        let config = ReplayConfig::new().unwrap();
        assert_eq!(config.record_prefix, "record");
        assert!(!config.entry_block_marker);
        assert_eq!(config.tagged_loads, TaggedLoads::Skip);
        assert_eq!(config.unhandled, 0xdeadbeefdeadbeef);
        assert_eq!(config.env_name, "env")
    }

    #[test]
    fn parse_errors_name_the_key() {
        let contents = include_str!("../default_config.toml").replace("tagged = \"skip\"", "tagged = \"maybe\"");
        assert!(ReplayConfig::parse(&contents).unwrap_err().contains("maybe"));

        let contents = include_str!("../default_config.toml").replace("[memory]", "[mem]");
        assert_eq!(ReplayConfig::parse(&contents).unwrap_err(), "No memory.unhandled found in config")
    }

    #[test]
    fn decimal_and_hex_values() {
        let contents = include_str!("../default_config.toml").replace("\"0xdeadbeefdeadbeef\"", "\"42\"");
        assert_eq!(ReplayConfig::parse(&contents).unwrap().unhandled, 42)
    }

    #[test]
    fn tagged_loads() {
        let config = ReplayConfig::new().unwrap();
        let load = Instr::new(1, Opcode::Load, vec![Operand::instr(0)]);
        assert!(!config.is_tagged(&load));
        assert!(config.is_tagged(&load.clone().with_metadata("host", &["rrupdate"])));
        assert!(!config.is_tagged(&load.clone().with_metadata("host", &["other"])));
        assert!(!config.is_tagged(&load.with_metadata("host", &[])))
    }

    #[test]
    fn record_calls() {
        let config = ReplayConfig::new().unwrap();
        assert!(config.is_record_call("record_load"));
        assert!(config.is_record_call("record"));
        assert!(!config.is_record_call("helper_record"))
    }
}
