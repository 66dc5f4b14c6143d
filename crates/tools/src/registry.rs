use rapidapi_core::{Error, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::assess::{AssessApiTool, CompareApisTool};
use crate::docs::{GetApiDocumentationTool, GetEnhancedApiDocumentationTool};
use crate::pricing::GetPricingPlansTool;
use crate::search_apis::SearchApisTool;
use crate::{Tool, ToolContext};

#[derive(Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        // Discovery
        registry.register(Arc::new(SearchApisTool));

        // Listing assessment
        registry.register(Arc::new(AssessApiTool));
        registry.register(Arc::new(CompareApisTool));
        registry.register(Arc::new(GetPricingPlansTool));

        // Documentation
        registry.register(Arc::new(GetApiDocumentationTool));
        registry.register(Arc::new(GetEnhancedApiDocumentationTool));

        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let schema = tool.schema();
        debug!(name = schema.name, "Registering tool");
        self.tools.insert(schema.name.to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Tool descriptors in MCP `tools/list` shape, sorted by name.
    pub fn get_tool_schemas(&self) -> Vec<Value> {
        let mut tools: Vec<&Arc<dyn Tool>> = self.tools.values().collect();
        tools.sort_by_key(|tool| tool.schema().name);
        tools
            .into_iter()
            .map(|tool| {
                let schema = tool.schema();
                json!({
                    "name": schema.name,
                    "description": schema.description,
                    "inputSchema": schema.parameters
                })
            })
            .collect()
    }

    /// Get all registered tool names, sorted.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn execute(&self, name: &str, ctx: ToolContext, params: Value) -> Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("Unknown tool: {}", name)))?;

        if let Err(e) = tool.validate(&params) {
            warn!(tool = name, error = %e, "Tool validation failed");
            return Err(e);
        }

        debug!(tool = name, "Executing tool");
        tool.execute(ctx, params).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakeLauncher;
    use crate::test_context;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_registry_new_empty() {
        let reg = ToolRegistry::new();
        assert!(reg.tool_names().is_empty());
        assert!(reg.get("assess_api").is_none());
    }

    #[test]
    fn test_registry_with_defaults_has_marketplace_tools() {
        let reg = ToolRegistry::with_defaults();
        assert_eq!(
            reg.tool_names(),
            vec![
                "assess_api",
                "compare_apis",
                "get_api_documentation",
                "get_enhanced_api_documentation",
                "get_pricing_plans",
                "search_apis",
            ]
        );
    }

    #[test]
    fn test_registry_get_tool_schemas() {
        let reg = ToolRegistry::with_defaults();
        let schemas = reg.get_tool_schemas();
        assert_eq!(schemas.len(), 6);
        assert_eq!(schemas[0]["name"], "assess_api");
        for schema in &schemas {
            assert!(schema["description"].is_string());
            assert_eq!(schema["inputSchema"]["type"], "object");
            assert!(schema["inputSchema"]["required"].is_array());
        }
    }

    #[test]
    fn test_registry_register_custom() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(SearchApisTool));
        assert!(reg.get("search_apis").is_some());
        assert_eq!(reg.tool_names().len(), 1);
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let reg = ToolRegistry::with_defaults();
        let ctx = test_context(Arc::new(FakeLauncher::new()));
        let err = reg.execute("delete_api", ctx, json!({})).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_execute_validates_before_launching() {
        let reg = ToolRegistry::with_defaults();
        let launcher = Arc::new(FakeLauncher::new());
        let ctx = test_context(launcher.clone());
        let err = reg
            .execute("assess_api", ctx, json!({"url": "not a url"}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(launcher.stats.launches.load(Ordering::SeqCst), 0);
    }
}
