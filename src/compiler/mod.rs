// src/compiler/mod.rs

//! Process compiler: diagram in, host-engine process definition out.
//!
//! - [`definition`] is the target model (compiled nodes, gateway configs).
//! - [`lowering`] walks a typed diagram and produces the flat node list.
//! - [`proxy`] decides where proxy nodes are needed and builds them.
//!
//! [`ProcessCompiler`] ties lowering to a [`ProcessEngine`]: a deploy
//! decodes, compiles, and submits, in that order, and nothing reaches the
//! engine unless decoding and lowering both succeeded.

use std::sync::Arc;

use tracing::{error, info};

use crate::config::CompilerOptions;
use crate::engine::ProcessEngine;
use crate::errors::Result;
use crate::flow::Diagram;

pub mod definition;
pub mod lowering;
pub mod proxy;

pub use definition::{
    CompiledNode, CompiledNodeType, GatewayCondition, GatewayConfig, JoinPolicy, NodeDefinitions,
    ProcessDefinition,
};
pub use lowering::compile_diagram;
pub use proxy::{needs_proxy, proxy_id};

pub struct ProcessCompiler<E: ProcessEngine> {
    engine: Arc<E>,
    options: CompilerOptions,
}

impl<E: ProcessEngine> std::fmt::Debug for ProcessCompiler<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessCompiler")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<E: ProcessEngine> ProcessCompiler<E> {
    pub fn new(engine: Arc<E>, options: CompilerOptions) -> Self {
        Self { engine, options }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Decode diagram JSON text using the configured unknown-type policy.
    pub fn decode(&self, diagram_json: &str) -> Result<Diagram> {
        Diagram::from_json(diagram_json, self.options.unknown_node_types)
    }

    /// Compile without submitting.
    pub fn compile(&self, name: &str, diagram: &Diagram) -> Result<ProcessDefinition> {
        compile_diagram(name, diagram, &self.options)
    }

    /// Decode, compile and submit diagram JSON. Returns the engine's
    /// process id.
    pub async fn deploy(&self, name: &str, diagram_json: &str) -> Result<String> {
        let diagram = self.decode(diagram_json)?;
        self.deploy_diagram(name, &diagram).await
    }

    /// Compile and submit an already decoded diagram.
    ///
    /// Submission errors are returned exactly as the engine reported them.
    pub async fn deploy_diagram(&self, name: &str, diagram: &Diagram) -> Result<String> {
        let definition = self.compile(name, diagram)?;
        let node_count = definition.nodes.len();

        match self.engine.submit_definition(definition).await {
            Ok(process_id) => {
                info!(
                    process = %name,
                    process_id = %process_id,
                    nodes = node_count,
                    "process definition deployed"
                );
                Ok(process_id)
            }
            Err(err) => {
                error!(process = %name, error = %err, "engine rejected process definition");
                Err(err)
            }
        }
    }
}
