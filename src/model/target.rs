use crate::model::{Error, Repository, Result};
use indexmap::IndexMap;
use serde_json::{from_str, Value};
use std::fs;

/// A named repository binding from the targets file, e.g. `vllm` ->
/// `vllm-project/vllm` looking back 14 days.
#[derive(Debug, Clone, Eq, Hash, PartialEq)]
pub struct Target {
    pub name: String,
    pub repository: Repository,
    pub days: u32,
}

// Create
impl Target {
    pub fn from_config(path: &str) -> Result<Vec<Self>> {
        let json_str = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_string(),
            source,
        })?;
        Self::parse(&json_str)
    }

    fn new(name: impl ToString, owner: &str, repo: &str, days: u32) -> Self {
        Self {
            name: name.to_string(),
            repository: Repository::new(owner, repo),
            days,
        }
    }

    pub fn find<'a>(targets: &'a [Self], name: &str) -> Result<&'a Self> {
        targets
            .iter()
            .find(|target| target.name == name)
            .ok_or_else(|| Error::UnknownTarget {
                name: name.to_string(),
                known: targets.iter().map(|t| t.name.as_str()).collect::<Vec<_>>().join(", "),
            })
    }
}

// Parser
impl Target {
    fn parse(json_str: &str) -> Result<Vec<Self>> {
        let elements: IndexMap<String, Value> = from_str(json_str)?;
        let mut result = Vec::new();
        for (name, details) in elements {
            let Some(owner) = details["owner"].as_str() else {
                return Err(Error::Config(format!("target `{name}`: missing 'owner' field")));
            };
            let Some(repo) = details["name"].as_str() else {
                return Err(Error::Config(format!("target `{name}`: missing 'name' field")));
            };
            let Some(days) = details["days"].as_u64() else {
                return Err(Error::Config(format!("target `{name}`: missing 'days' field")));
            };
            let Ok(days) = u32::try_from(days) else {
                return Err(Error::Config(format!("target `{name}`: 'days' out of range")));
            };
            result.push(Self::new(name, owner, repo, days));
        }
        Ok(result)
    }
}
