use crate::constants::{CACHE_CAPACITY_ENV, DEFAULT_CACHE_CAPACITY, SHAPE_POLICY_ENV};
use crate::error::{EngineError, Result};
use clap::Parser;
use std::fmt;
use std::str::FromStr;

/// How a mutator's new state may differ in shape from the state it replaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ShapePolicy {
    /// Any record is accepted.
    Any,
    /// New fields may appear; existing fields must not disappear.
    #[default]
    RejectNarrowing,
}

impl FromStr for ShapePolicy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "any" => Ok(Self::Any),
            "reject-narrowing" => Ok(Self::RejectNarrowing),
            other => Err(EngineError::invalid_configuration(
                SHAPE_POLICY_ENV,
                format!("'{}' (expected 'any' or 'reject-narrowing')", other),
            )),
        }
    }
}

impl fmt::Display for ShapePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::RejectNarrowing => write!(f, "reject-narrowing"),
        }
    }
}

/// Settings shared by every capability object a binder produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Capability objects kept by the construction cache; 0 disables it.
    pub cache_capacity: usize,
    pub shape_policy: ShapePolicy,
}

impl EngineConfig {
    /// Resolves the configuration from the environment, falling back to
    /// defaults for unset variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup(CACHE_CAPACITY_ENV) {
            config.cache_capacity = raw
                .trim()
                .parse()
                .map_err(|e| EngineError::invalid_configuration(CACHE_CAPACITY_ENV, e))?;
        }

        if let Some(raw) = lookup(SHAPE_POLICY_ENV) {
            config.shape_policy = raw.parse()?;
        }

        Ok(config)
    }

    /// The same configuration with the construction cache switched off.
    pub fn uncached(self) -> Self {
        Self {
            cache_capacity: 0,
            ..self
        }
    }

    pub fn with_shape_policy(self, shape_policy: ShapePolicy) -> Self {
        Self {
            shape_policy,
            ..self
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            shape_policy: ShapePolicy::default(),
        }
    }
}

/// Parsed command-line input for the ledger demo.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    /// Steps to apply, each `name` or `name:argument` (e.g. `deposit:50 withdraw:20 balance`)
    pub steps: Vec<String>,

    /// Opening balance of the ledger
    #[arg(long, default_value_t = 0)]
    pub opening: i64,

    /// Wrap `withdraw` with a composed layer rejecting amounts above this limit
    #[arg(long)]
    pub limit: Option<i64>,

    /// Construction cache capacity (0 disables caching); defaults to the environment
    #[arg(long)]
    pub cache_capacity: Option<usize>,

    /// Shape policy for mutator results; defaults to the environment
    #[arg(long, value_enum)]
    pub shape_policy: Option<ShapePolicy>,

    /// Print the operation descriptors of the final capability as JSON
    #[arg(long, default_value_t = false)]
    pub describe: bool,

    /// Enable verbose logging (debug level)
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Resolved demo configuration — validated and ready to drive the ledger.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub engine: EngineConfig,
    pub steps: Vec<Step>,
    pub opening: i64,
    pub limit: Option<i64>,
    pub describe: bool,
    pub verbose: bool,
}

/// A single `name[:argument]` invocation requested on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub operation: String,
    pub argument: Option<i64>,
}

impl FromStr for Step {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let (operation, argument) = match s.split_once(':') {
            Some((name, raw)) => {
                let argument = raw.trim().parse().map_err(|e| {
                    EngineError::invalid_configuration(format!("step '{}'", s), e)
                })?;
                (name, Some(argument))
            }
            None => (s, None),
        };

        let operation = operation.trim();
        if operation.is_empty() {
            return Err(EngineError::invalid_configuration(
                format!("step '{}'", s),
                "missing operation name",
            ));
        }

        Ok(Self {
            operation: operation.to_string(),
            argument,
        })
    }
}

impl DemoConfig {
    /// Resolves a complete demo configuration from CLI input and environment.
    pub fn resolve(cli: CommandLineInput) -> Result<Self> {
        let mut engine = EngineConfig::from_env()?;
        if let Some(capacity) = cli.cache_capacity {
            engine.cache_capacity = capacity;
        }
        if let Some(policy) = cli.shape_policy {
            engine.shape_policy = policy;
        }

        let steps = cli
            .steps
            .iter()
            .map(|raw| raw.parse())
            .collect::<Result<Vec<Step>>>()?;

        Ok(Self {
            engine,
            steps,
            opening: cli.opening,
            limit: cli.limit,
            describe: cli.describe,
            verbose: cli.verbose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert_eq!(config.shape_policy, ShapePolicy::RejectNarrowing);
    }

    #[test]
    fn test_environment_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            (CACHE_CAPACITY_ENV, " 16 "),
            (SHAPE_POLICY_ENV, "any"),
        ]))
        .unwrap();
        assert_eq!(config.cache_capacity, 16);
        assert_eq!(config.shape_policy, ShapePolicy::Any);
    }

    #[test]
    fn test_invalid_environment_values() {
        let err = EngineConfig::from_lookup(lookup(&[(CACHE_CAPACITY_ENV, "lots")])).unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::InvalidConfiguration {
                key: CACHE_CAPACITY_ENV.to_string()
            }
        );

        let err = EngineConfig::from_lookup(lookup(&[(SHAPE_POLICY_ENV, "strict")])).unwrap_err();
        assert!(err.message().contains("'strict'"));
    }

    #[test]
    fn test_uncached_keeps_policy() {
        let config = EngineConfig::default()
            .with_shape_policy(ShapePolicy::Any)
            .uncached();
        assert_eq!(config.cache_capacity, 0);
        assert_eq!(config.shape_policy, ShapePolicy::Any);
    }

    #[test]
    fn test_step_parsing() {
        assert_eq!(
            "deposit:50".parse::<Step>().unwrap(),
            Step {
                operation: "deposit".to_string(),
                argument: Some(50),
            }
        );
        assert_eq!(
            "balance".parse::<Step>().unwrap(),
            Step {
                operation: "balance".to_string(),
                argument: None,
            }
        );
        assert!("deposit:fifty".parse::<Step>().is_err());
        assert!(":5".parse::<Step>().is_err());
    }
}
