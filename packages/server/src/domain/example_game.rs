//! Built-in example games.
//!
//! Every new session starts with [`ExampleGame::BouncingShape`] running, and
//! any participant can swap in another example.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::error::UnknownExample;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExampleGame {
    /// Breakout-style paddle and bricks
    #[default]
    #[serde(rename = "bouncing")]
    BouncingShape,
    Platformer,
    Shooter,
}

impl ExampleGame {
    pub const ALL: [ExampleGame; 3] = [
        ExampleGame::BouncingShape,
        ExampleGame::Platformer,
        ExampleGame::Shooter,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ExampleGame::BouncingShape => "bouncing",
            ExampleGame::Platformer => "platformer",
            ExampleGame::Shooter => "shooter",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            ExampleGame::BouncingShape => include_str!("sketches/bouncing_shape.js"),
            ExampleGame::Platformer => include_str!("sketches/platformer.js"),
            ExampleGame::Shooter => include_str!("sketches/shooter.js"),
        }
    }
}

impl fmt::Display for ExampleGame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExampleGame {
    type Err = UnknownExample;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|example| example.name() == name)
            .ok_or_else(|| UnknownExample(s.trim().to_string()))
    }
}
