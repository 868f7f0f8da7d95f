//! Role agents for each pipeline phase.
//!
//! Every role is a prompt pair run through the shared [`ToolLoop`] with a
//! phase-specific tool registry and sampling temperature.

pub mod brief;
pub mod production;
pub mod research;

use contentcrew_tools::Toolkit;

use crate::loop_runner::ToolLoop;
use crate::qa::QaController;

pub use brief::BriefInput;
pub use production::{ArticleSpec, ProductionInput};
pub use research::{ResearchInput, ResearchOutput};

/// The agents of one run: a tool loop, the toolkit and the QA gate.
#[derive(Debug, Clone)]
pub struct Crew {
    agent: ToolLoop,
    toolkit: Toolkit,
    qa: QaController,
}

impl Crew {
    pub fn new(agent: ToolLoop, toolkit: Toolkit, qa: QaController) -> Self {
        Self { agent, toolkit, qa }
    }

    pub fn agent(&self) -> &ToolLoop {
        &self.agent
    }

    pub fn qa(&self) -> &QaController {
        &self.qa
    }
}
