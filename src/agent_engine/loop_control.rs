/// Turn budget for one run. Without a limit the loop only stops on `DONE` or a fatal step.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct LoopConfig {
    pub max_turns: Option<u32>,
}

pub struct LoopController {
    config: LoopConfig,
    turns: u32,
}

impl LoopController {
    pub fn new(config: LoopConfig) -> Self {
        Self { config, turns: 0 }
    }

    pub fn record_turn(&mut self) {
        self.turns += 1;
    }

    pub fn turns(&self) -> u32 {
        self.turns
    }

    pub fn should_stop(&self) -> bool {
        match self.config.max_turns {
            Some(max) => self.turns >= max,
            None => false,
        }
    }
}
