//! STM32N6 development tools
//!
//! Every tool implements [`Capability`](crate::capability::Capability) and is
//! registered into a [`ToolRegistry`] at startup.

pub mod analysis;
pub mod build;
pub mod clock;
pub mod debug;
pub mod flash;
pub mod model;
pub mod peripheral;
pub mod register;
pub mod registry;
pub mod types;

use std::path::Path;
use std::sync::Arc;

use crate::error::Result;

pub use analysis::{MemoryMapTool, TraceAnalyzeTool};
pub use build::Stm32BuildTool;
pub use clock::ClockConfigTool;
pub use debug::Stm32DebugTool;
pub use flash::Stm32FlashTool;
pub use model::{ModelConvertTool, ModelQuantizeTool};
pub use peripheral::PeripheralConfigTool;
pub use register::RegisterInspectTool;
pub use registry::ToolRegistry;

pub(crate) async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Register the ten built-in tools
pub fn register_all_tools(registry: &mut ToolRegistry) -> Result<()> {
    registry.register(Arc::new(Stm32BuildTool))?;
    registry.register(Arc::new(Stm32FlashTool))?;
    registry.register(Arc::new(Stm32DebugTool))?;
    registry.register(Arc::new(PeripheralConfigTool))?;
    registry.register(Arc::new(ClockConfigTool))?;
    registry.register(Arc::new(ModelConvertTool))?;
    registry.register(Arc::new(ModelQuantizeTool))?;
    registry.register(Arc::new(TraceAnalyzeTool))?;
    registry.register(Arc::new(MemoryMapTool))?;
    registry.register(Arc::new(RegisterInspectTool::new()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Category;

    #[test]
    fn test_register_all_tools() {
        let mut registry = ToolRegistry::new();
        register_all_tools(&mut registry).unwrap();
        assert_eq!(registry.count(), 10);
        assert_eq!(registry.list_by_category(Category::AiMl).len(), 2);
        assert_eq!(registry.list_by_category(Category::Debug).len(), 2);
        assert!(register_all_tools(&mut registry).is_err());
    }

    #[test]
    fn test_every_tool_publishes_object_schema() {
        let mut registry = ToolRegistry::new();
        register_all_tools(&mut registry).unwrap();
        for tool in registry.list_all() {
            let schema = tool.json_schema();
            assert_eq!(schema["type"], "object", "{}", tool.name());
            assert!(schema["properties"].as_object().is_some_and(|p| !p.is_empty()));
        }
    }
}
