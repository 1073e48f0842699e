// ABOUTME: Launch plans: descriptors bound to deterministic ports.
// ABOUTME: Port k of the selection is always base_port + k, regardless of launch results.

use crate::config::BASE_PORT_VAR;
use crate::error::{HubError, Result};
use crate::registry::ServerDescriptor;

/// A descriptor paired with the port its adapter binds for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub server: ServerDescriptor,
    pub port: u16,
}

impl LaunchPlan {
    pub fn name(&self) -> &str {
        &self.server.name
    }
}

/// Assign ports to the selected servers in selection order.
pub fn plan_launches(selected: &[ServerDescriptor], base_port: u16) -> Result<Vec<LaunchPlan>> {
    selected
        .iter()
        .enumerate()
        .map(|(index, server)| {
            let port = u16::try_from(index)
                .ok()
                .and_then(|offset| base_port.checked_add(offset))
                .ok_or_else(|| {
                    HubError::invalid(
                        BASE_PORT_VAR,
                        base_port.to_string(),
                        format!("no port left for server #{index} '{}'", server.name),
                    )
                })?;
            Ok(LaunchPlan {
                server: server.clone(),
                port,
            })
        })
        .collect()
}
