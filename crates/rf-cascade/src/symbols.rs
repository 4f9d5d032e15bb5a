//! Symbol and level taxonomy

use serde::{Deserialize, Serialize};

/// Symbol role classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    /// Regular cluster-paying symbol
    Base,
    /// Cluster-paying symbol that also escalates the cascade multiplier
    Bonus,
    /// Starts free rounds, at most one per grid
    Trigger,
    /// Level-specific collectible that feeds stage progress
    StageClear,
}

/// A grid symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbol {
    Purple,
    Green,
    Yellow,
    Blue,
    Red,
    Clover,
    RainbowEgg,
    OrangeSlice,
    HoneyPot,
    Strawberry,
}

impl Symbol {
    /// Every symbol, in declaration order
    pub const ALL: [Symbol; 10] = [
        Symbol::Purple,
        Symbol::Green,
        Symbol::Yellow,
        Symbol::Blue,
        Symbol::Red,
        Symbol::Clover,
        Symbol::RainbowEgg,
        Symbol::OrangeSlice,
        Symbol::HoneyPot,
        Symbol::Strawberry,
    ];

    /// Base symbols plus the bonus symbol
    pub const CONNECTION_FORMING: [Symbol; 6] = [
        Symbol::Purple,
        Symbol::Green,
        Symbol::Yellow,
        Symbol::Blue,
        Symbol::Red,
        Symbol::Clover,
    ];

    pub const BONUS: Symbol = Symbol::Clover;
    pub const TRIGGER: Symbol = Symbol::RainbowEgg;

    pub fn kind(self) -> SymbolKind {
        match self {
            Symbol::Purple | Symbol::Green | Symbol::Yellow | Symbol::Blue | Symbol::Red => {
                SymbolKind::Base
            }
            Symbol::Clover => SymbolKind::Bonus,
            Symbol::RainbowEgg => SymbolKind::Trigger,
            Symbol::OrangeSlice | Symbol::HoneyPot | Symbol::Strawberry => SymbolKind::StageClear,
        }
    }

    /// Can this symbol join a flood-filled winning group?
    #[inline]
    pub fn forms_connections(self) -> bool {
        matches!(self.kind(), SymbolKind::Base | SymbolKind::Bonus)
    }

    #[inline]
    pub fn is_bonus(self) -> bool {
        self.kind() == SymbolKind::Bonus
    }

    #[inline]
    pub fn is_trigger(self) -> bool {
        self.kind() == SymbolKind::Trigger
    }

    #[inline]
    pub fn is_stage_clear(self) -> bool {
        self.kind() == SymbolKind::StageClear
    }

    /// Wire name (matches the serde representation)
    pub fn name(self) -> &'static str {
        match self {
            Symbol::Purple => "purple",
            Symbol::Green => "green",
            Symbol::Yellow => "yellow",
            Symbol::Blue => "blue",
            Symbol::Red => "red",
            Symbol::Clover => "clover",
            Symbol::RainbowEgg => "rainbow_egg",
            Symbol::OrangeSlice => "orange_slice",
            Symbol::HoneyPot => "honey_pot",
            Symbol::Strawberry => "strawberry",
        }
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Progression tier
///
/// Serialized as its ordinal (1, 2 or 3); anything else is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum Level {
    One = 1,
    Two = 2,
    Three = 3,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::One, Level::Two, Level::Three];

    /// Side length of the square grid
    pub fn grid_size(self) -> usize {
        match self {
            Level::One => 4,
            Level::Two => 5,
            Level::Three => 6,
        }
    }

    /// Smallest component that counts as a connection
    pub fn min_connection(self) -> usize {
        match self {
            Level::One => 4,
            Level::Two => 5,
            Level::Three => 6,
        }
    }

    /// The only stage-clear symbol that counts on this level
    pub fn stage_clear_symbol(self) -> Symbol {
        match self {
            Level::One => Symbol::OrangeSlice,
            Level::Two => Symbol::HoneyPot,
            Level::Three => Symbol::Strawberry,
        }
    }

    /// Next tier; the top tier wraps back to the first
    pub fn next(self) -> Level {
        match self {
            Level::One => Level::Two,
            Level::Two => Level::Three,
            Level::Three => Level::One,
        }
    }

    /// Is this the top tier (advancing wraps)?
    pub fn is_top(self) -> bool {
        self == Level::Three
    }

    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl Default for Level {
    fn default() -> Self {
        Self::One
    }
}

impl TryFrom<u8> for Level {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Level::One),
            2 => Ok(Level::Two),
            3 => Ok(Level::Three),
            other => Err(format!("invalid level: {}", other)),
        }
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level.as_u8()
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_classification() {
        let forming: Vec<Symbol> = Symbol::ALL
            .iter()
            .copied()
            .filter(|s| s.forms_connections())
            .collect();
        assert_eq!(forming, Symbol::CONNECTION_FORMING.to_vec());

        assert!(Symbol::Clover.is_bonus());
        assert!(Symbol::RainbowEgg.is_trigger());
        assert!(!Symbol::RainbowEgg.forms_connections());
        assert!(Symbol::HoneyPot.is_stage_clear());
        assert!(!Symbol::HoneyPot.forms_connections());
    }

    #[test]
    fn test_level_table() {
        assert_eq!(Level::One.grid_size(), 4);
        assert_eq!(Level::Two.grid_size(), 5);
        assert_eq!(Level::Three.grid_size(), 6);
        for level in Level::ALL {
            assert_eq!(level.grid_size(), level.min_connection());
            assert!(level.stage_clear_symbol().is_stage_clear());
        }
    }

    #[test]
    fn test_level_cycles() {
        assert_eq!(Level::One.next(), Level::Two);
        assert_eq!(Level::Two.next(), Level::Three);
        assert_eq!(Level::Three.next(), Level::One);
    }

    #[test]
    fn test_level_serde() {
        assert_eq!(serde_json::to_string(&Level::Two).unwrap(), "2");
        assert_eq!(serde_json::from_str::<Level>("3").unwrap(), Level::Three);
        assert!(serde_json::from_str::<Level>("0").is_err());
        assert!(serde_json::from_str::<Level>("4").is_err());
    }

    #[test]
    fn test_symbol_wire_names() {
        for symbol in Symbol::ALL {
            let json = serde_json::to_string(&symbol).unwrap();
            assert_eq!(json, format!("\"{}\"", symbol.name()));
        }
    }
}
