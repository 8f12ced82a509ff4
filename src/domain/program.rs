use serde::{Deserialize, Serialize};

/// Which of the two on-chain programs a mint currently trades on (§3 Token
/// "current program"). A mint moves bonding_curve -> amm_pool exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Program {
    BondingCurve,
    AmmPool,
}

impl Program {
    pub fn as_str(self) -> &'static str {
        match self {
            Program::BondingCurve => "bonding_curve",
            Program::AmmPool => "amm_pool",
        }
    }
}

impl std::fmt::Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Program {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bonding_curve" => Ok(Program::BondingCurve),
            "amm_pool" => Ok(Program::AmmPool),
            other => Err(format!("unknown program tag: {other}")),
        }
    }
}
