//! Compile settings
//!
//! Everything the language server can reconfigure between compiles: target
//! EVM version, revert-string handling, model checker selectors, and the
//! optimiser profile. Each selector parses from the string form used in
//! configuration payloads; parse failures leave the current value alone.

use crate::frontend::sources::Remapping;

/// Named EVM hard fork the compiler targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvmVersion {
    Homestead,
    TangerineWhistle,
    SpuriousDragon,
    Byzantium,
    Constantinople,
    Petersburg,
    Istanbul,
    Berlin,
    London,
    Paris,
    Shanghai,
    #[default]
    Cancun,
}

impl EvmVersion {
    pub fn from_name(name: &str) -> Option<EvmVersion> {
        match name {
            "homestead" => Some(EvmVersion::Homestead),
            "tangerineWhistle" => Some(EvmVersion::TangerineWhistle),
            "spuriousDragon" => Some(EvmVersion::SpuriousDragon),
            "byzantium" => Some(EvmVersion::Byzantium),
            "constantinople" => Some(EvmVersion::Constantinople),
            "petersburg" => Some(EvmVersion::Petersburg),
            "istanbul" => Some(EvmVersion::Istanbul),
            "berlin" => Some(EvmVersion::Berlin),
            "london" => Some(EvmVersion::London),
            "paris" => Some(EvmVersion::Paris),
            "shanghai" => Some(EvmVersion::Shanghai),
            "cancun" => Some(EvmVersion::Cancun),
            _ => None,
        }
    }
}

/// How revert reason strings are compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevertStrings {
    #[default]
    Default,
    Strip,
    Debug,
    VerboseDebug,
}

impl RevertStrings {
    pub fn from_name(name: &str) -> Option<RevertStrings> {
        match name {
            "default" => Some(RevertStrings::Default),
            "strip" => Some(RevertStrings::Strip),
            "debug" => Some(RevertStrings::Debug),
            "verboseDebug" => Some(RevertStrings::VerboseDebug),
            _ => None,
        }
    }
}

/// Which contracts the model checker analyzes; empty means all
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModelCheckerContracts {
    pub selections: Vec<ContractSelection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractSelection {
    pub file: String,
    pub contract: String,
}

impl ModelCheckerContracts {
    /// Parse `file1:contract1,file2:contract2`. An empty string selects
    /// every contract.
    pub fn from_string(value: &str) -> Option<ModelCheckerContracts> {
        if value.is_empty() {
            return Some(ModelCheckerContracts::default());
        }
        let mut selections = Vec::new();
        for part in value.split(',') {
            let (file, contract) = part.split_once(':')?;
            if file.is_empty() || contract.is_empty() {
                return None;
            }
            selections.push(ContractSelection {
                file: file.to_string(),
                contract: contract.to_string(),
            });
        }
        Some(ModelCheckerContracts { selections })
    }
}

/// Model checker back ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelCheckerEngine {
    pub bmc: bool,
    pub chc: bool,
}

impl Default for ModelCheckerEngine {
    fn default() -> Self {
        Self {
            bmc: false,
            chc: false,
        }
    }
}

impl ModelCheckerEngine {
    pub fn from_name(name: &str) -> Option<ModelCheckerEngine> {
        match name {
            "none" => Some(ModelCheckerEngine {
                bmc: false,
                chc: false,
            }),
            "bmc" => Some(ModelCheckerEngine {
                bmc: true,
                chc: false,
            }),
            "chc" => Some(ModelCheckerEngine {
                bmc: false,
                chc: true,
            }),
            "all" => Some(ModelCheckerEngine {
                bmc: true,
                chc: true,
            }),
            _ => None,
        }
    }
}

/// Properties the model checker proves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerificationTarget {
    ConstantCondition,
    Underflow,
    Overflow,
    DivByZero,
    Balance,
    Assert,
    PopEmptyArray,
    OutOfBounds,
}

impl VerificationTarget {
    fn from_name(name: &str) -> Option<VerificationTarget> {
        match name {
            "constantCondition" => Some(VerificationTarget::ConstantCondition),
            "underflow" => Some(VerificationTarget::Underflow),
            "overflow" => Some(VerificationTarget::Overflow),
            "divByZero" => Some(VerificationTarget::DivByZero),
            "balance" => Some(VerificationTarget::Balance),
            "assert" => Some(VerificationTarget::Assert),
            "popEmptyArray" => Some(VerificationTarget::PopEmptyArray),
            "outOfBounds" => Some(VerificationTarget::OutOfBounds),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCheckerTargets {
    pub targets: Vec<VerificationTarget>,
}

impl Default for ModelCheckerTargets {
    fn default() -> Self {
        Self {
            targets: vec![
                VerificationTarget::ConstantCondition,
                VerificationTarget::DivByZero,
                VerificationTarget::Balance,
                VerificationTarget::Assert,
                VerificationTarget::PopEmptyArray,
                VerificationTarget::OutOfBounds,
            ],
        }
    }
}

impl ModelCheckerTargets {
    /// Parse `default`, `all`, or a comma-separated target list.
    pub fn from_string(value: &str) -> Option<ModelCheckerTargets> {
        match value {
            "default" => Some(ModelCheckerTargets::default()),
            "all" => Some(ModelCheckerTargets {
                targets: vec![
                    VerificationTarget::ConstantCondition,
                    VerificationTarget::Underflow,
                    VerificationTarget::Overflow,
                    VerificationTarget::DivByZero,
                    VerificationTarget::Balance,
                    VerificationTarget::Assert,
                    VerificationTarget::PopEmptyArray,
                    VerificationTarget::OutOfBounds,
                ],
            }),
            _ => {
                let mut targets = Vec::new();
                for part in value.split(',') {
                    targets.push(VerificationTarget::from_name(part)?);
                }
                Some(ModelCheckerTargets { targets })
            }
        }
    }
}

/// Model checker configuration
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelCheckerSettings {
    pub contracts: ModelCheckerContracts,
    pub engine: ModelCheckerEngine,
    pub targets: ModelCheckerTargets,
    /// Per-query timeout in milliseconds
    pub timeout: Option<u64>,
}

/// Optimiser profile; analysis-only compiles carry it through unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimiserSettings {
    pub enabled: bool,
    pub runs: u32,
}

impl OptimiserSettings {
    pub fn standard() -> Self {
        Self {
            enabled: true,
            runs: 200,
        }
    }

    pub fn minimal() -> Self {
        Self {
            enabled: false,
            runs: 200,
        }
    }
}

/// Everything a compile is parameterized by
#[derive(Debug, Clone)]
pub struct CompileSettings {
    pub evm_version: EvmVersion,
    pub revert_strings: RevertStrings,
    pub model_checker: ModelCheckerSettings,
    pub optimiser: OptimiserSettings,
    pub remappings: Vec<Remapping>,
}

impl Default for CompileSettings {
    fn default() -> Self {
        Self {
            evm_version: EvmVersion::default(),
            revert_strings: RevertStrings::default(),
            model_checker: ModelCheckerSettings::default(),
            optimiser: OptimiserSettings::minimal(),
            remappings: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evm_version_names() {
        assert_eq!(EvmVersion::from_name("berlin"), Some(EvmVersion::Berlin));
        assert_eq!(EvmVersion::from_name("cancun"), Some(EvmVersion::Cancun));
        assert_eq!(EvmVersion::from_name("petersburgh"), None);
    }

    #[test]
    fn test_revert_strings_names() {
        assert_eq!(
            RevertStrings::from_name("verboseDebug"),
            Some(RevertStrings::VerboseDebug)
        );
        assert_eq!(RevertStrings::from_name("verbose"), None);
    }

    #[test]
    fn test_model_checker_contracts() {
        let parsed = ModelCheckerContracts::from_string("a.sbl:Vault,b.sbl:Token").unwrap();
        assert_eq!(parsed.selections.len(), 2);
        assert_eq!(parsed.selections[0].file, "a.sbl");
        assert_eq!(parsed.selections[1].contract, "Token");
        assert!(ModelCheckerContracts::from_string("a.sbl").is_none());
        assert!(ModelCheckerContracts::from_string("").unwrap().selections.is_empty());
    }

    #[test]
    fn test_model_checker_engine() {
        assert_eq!(
            ModelCheckerEngine::from_name("all"),
            Some(ModelCheckerEngine {
                bmc: true,
                chc: true
            })
        );
        assert!(ModelCheckerEngine::from_name("smt").is_none());
    }

    #[test]
    fn test_model_checker_targets() {
        let parsed = ModelCheckerTargets::from_string("assert,overflow").unwrap();
        assert_eq!(
            parsed.targets,
            vec![VerificationTarget::Assert, VerificationTarget::Overflow]
        );
        assert!(ModelCheckerTargets::from_string("assert,bogus").is_none());
        assert_eq!(
            ModelCheckerTargets::from_string("default").unwrap(),
            ModelCheckerTargets::default()
        );
    }
}
