//! Canned MCP prompts for common STM32N6 workflows

use rmcp::model::{GetPromptResult, JsonObject, Prompt, PromptArgument, PromptMessage, PromptMessageRole};
use serde_json::Value;

pub const PROJECT_SETUP: &str = "stm32n6-project-setup";
pub const DRIVER_CREATE: &str = "stm32n6-driver-create";
pub const MODEL_DEPLOY: &str = "stm32n6-model-deploy";

struct PromptDef {
    name: &'static str,
    description: &'static str,
    /// (name, description, required)
    arguments: &'static [(&'static str, &'static str, bool)],
}

const PROMPTS: &[PromptDef] = &[
    PromptDef {
        name: PROJECT_SETUP,
        description: "Initialize a new STM32N6 project with proper structure",
        arguments: &[
            ("projectName", "Name of the project", true),
            ("template", "Project template (base, freertos, aiml, graphics, networking)", false),
        ],
    },
    PromptDef {
        name: DRIVER_CREATE,
        description: "Generate peripheral driver code",
        arguments: &[
            ("peripheral", "Peripheral type (I2C, SPI, UART, CAN, etc.)", true),
            ("mode", "Operating mode (master, slave, etc.)", true),
        ],
    },
    PromptDef {
        name: MODEL_DEPLOY,
        description: "Deploy ML model to Neural-ART NPU",
        arguments: &[
            ("modelPath", "Path to the model file", true),
            ("quantize", "Quantization scheme (int8, int4, mixed)", false),
        ],
    },
];

pub fn list_prompts() -> Vec<Prompt> {
    PROMPTS
        .iter()
        .map(|def| {
            let arguments = def
                .arguments
                .iter()
                .map(|(name, description, required)| PromptArgument {
                    title: None,
                    name: name.to_string(),
                    description: Some(description.to_string()),
                    required: Some(*required),
                })
                .collect();
            Prompt::new(def.name, Some(def.description), Some(arguments))
        })
        .collect()
}

/// Render a prompt as a single user message. Missing arguments take their defaults.
/// Returns `None` for unknown prompt names.
pub fn get_prompt(name: &str, arguments: Option<&JsonObject>) -> Option<GetPromptResult> {
    let arg = |key: &str, default: &'static str| -> String {
        arguments
            .and_then(|args| args.get(key))
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    };

    let text = match name {
        PROJECT_SETUP => format!(
            "Initialize a new STM32N6 project named \"{}\" using the {} template. Create the directory \
             structure, copy HAL drivers, and generate startup code for STM32N6570-DK.",
            arg("projectName", "my_project"),
            arg("template", "base")
        ),
        DRIVER_CREATE => format!(
            "Generate a {} driver for STM32N6 in {} mode. Include DMA support and interrupt handlers.",
            arg("peripheral", "I2C"),
            arg("mode", "master")
        ),
        MODEL_DEPLOY => format!(
            "Deploy the ML model at \"{}\" to STM32N6 Neural-ART NPU. Apply {} quantization for optimal performance.",
            arg("modelPath", "model.onnx"),
            arg("quantize", "int8")
        ),
        _ => return None,
    };

    let description = PROMPTS.iter().find(|def| def.name == name).map(|def| def.description.to_string());
    Some(GetPromptResult {
        description,
        messages: vec![PromptMessage::new_text(PromptMessageRole::User, text)],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::PromptMessageContent;
    use serde_json::json;

    fn text(result: &GetPromptResult) -> String {
        match &result.messages[0].content {
            PromptMessageContent::Text { text } => text.clone(),
            _ => String::new(),
        }
    }

    #[test]
    fn test_list_prompts() {
        let prompts = list_prompts();
        let names: Vec<&str> = prompts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec![PROJECT_SETUP, DRIVER_CREATE, MODEL_DEPLOY]);
        let driver_args = prompts[1].arguments.as_ref().unwrap();
        assert!(driver_args.iter().all(|a| a.required == Some(true)));
        let deploy_args = prompts[2].arguments.as_ref().unwrap();
        assert_eq!(deploy_args[1].name, "quantize");
        assert_eq!(deploy_args[1].required, Some(false));
    }

    #[test]
    fn test_prompt_defaults() {
        let setup = get_prompt(PROJECT_SETUP, None).unwrap();
        assert!(text(&setup).starts_with("Initialize a new STM32N6 project named \"my_project\" using the base template."));
        assert_eq!(setup.messages[0].role, PromptMessageRole::User);

        let driver = get_prompt(DRIVER_CREATE, None).unwrap();
        assert!(text(&driver).starts_with("Generate a I2C driver for STM32N6 in master mode."));

        let deploy = get_prompt(MODEL_DEPLOY, None).unwrap();
        assert!(text(&deploy).contains("\"model.onnx\""));
        assert!(text(&deploy).contains("Apply int8 quantization"));
    }

    #[test]
    fn test_prompt_arguments_and_unknown_name() {
        let args = json!({"modelPath": "net.tflite", "quantize": "int4"});
        let deploy = get_prompt(MODEL_DEPLOY, args.as_object()).unwrap();
        assert!(text(&deploy).contains("\"net.tflite\""));
        assert!(text(&deploy).contains("Apply int4 quantization"));
        assert_eq!(deploy.description.as_deref(), Some("Deploy ML model to Neural-ART NPU"));

        assert!(get_prompt("stm32n6-flash-all", None).is_none());
    }
}
