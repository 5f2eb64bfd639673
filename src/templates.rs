//! Template engine for generated STM32 source files
//!
//! Templates use `{{VAR}}` placeholders, optionally prefixed by a case helper
//! (`{{upper VAR}}`, `{{lower VAR}}`, `{{camel VAR}}`, `{{pascal VAR}}`,
//! `{{snake VAR}}`). `{{! text }}` is a comment; the first one in a template
//! doubles as its description. Placeholders with no matching variable are
//! left untouched.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::Serialize;

use crate::error::CapabilityError;

pub const TEMPLATE_DRIVER_HEADER: &str = r#"{{! Peripheral driver header with status codes, handle and prototypes }}
/**
 * {{PERIPHERAL}} Driver Header
 * Generated for {{MCU}}
 * Mode: {{MODE}}
 * Driver Type: {{DRIVER_TYPE}}
 */

#ifndef __{{upper PERIPHERAL}}_DRIVER_H
#define __{{upper PERIPHERAL}}_DRIVER_H

#ifdef __cplusplus
extern "C" {
#endif

#include "stm32n6xx.h"
#include "{{snake PERIPHERAL}}_config.h"

typedef enum {
    {{PERIPHERAL}}_OK = 0,
    {{PERIPHERAL}}_ERROR = -1,
    {{PERIPHERAL}}_BUSY = -2,
    {{PERIPHERAL}}_TIMEOUT = -3,
    {{PERIPHERAL}}_INVALID_PARAM = -4,
} {{PERIPHERAL}}_Status_t;

typedef struct {
    {{PERIPHERAL_TYPE}}_TypeDef *instance;
    {{PERIPHERAL}}_Config_t config;
    volatile bool isInitialized;
    volatile bool isBusy;

    void (*txCompleteCallback)(void);
    void (*rxCompleteCallback)(void);
    void (*errorCallback)({{PERIPHERAL}}_Status_t error);
} {{PERIPHERAL}}_Handle_t;

{{PERIPHERAL}}_Status_t {{PERIPHERAL}}_Init({{PERIPHERAL}}_Handle_t *handle, const {{PERIPHERAL}}_Config_t *config);
{{PERIPHERAL}}_Status_t {{PERIPHERAL}}_DeInit({{PERIPHERAL}}_Handle_t *handle);
{{PERIPHERAL}}_Status_t {{PERIPHERAL}}_Transmit({{PERIPHERAL}}_Handle_t *handle, const uint8_t *data, uint16_t len, uint32_t timeout);
{{PERIPHERAL}}_Status_t {{PERIPHERAL}}_Receive({{PERIPHERAL}}_Handle_t *handle, uint8_t *data, uint16_t len, uint32_t timeout);

#ifdef __cplusplus
}
#endif

#endif /* __{{upper PERIPHERAL}}_DRIVER_H */
"#;

pub const TEMPLATE_DRIVER_SOURCE: &str = r#"{{! Peripheral driver implementation skeleton }}
/**
 * {{PERIPHERAL}} Driver Source
 * Generated for {{MCU}}
 */

#include "{{snake PERIPHERAL}}_driver.h"
#include <string.h>

{{PERIPHERAL}}_Status_t {{PERIPHERAL}}_Init({{PERIPHERAL}}_Handle_t *handle, const {{PERIPHERAL}}_Config_t *config)
{
    if (handle == NULL || config == NULL) {
        return {{PERIPHERAL}}_INVALID_PARAM;
    }

    memcpy(&handle->config, config, sizeof({{PERIPHERAL}}_Config_t));

    /* Enable the {{PERIPHERAL}} clock and configure its GPIO pins here */

    handle->isInitialized = true;
    handle->isBusy = false;

    return {{PERIPHERAL}}_OK;
}

{{PERIPHERAL}}_Status_t {{PERIPHERAL}}_DeInit({{PERIPHERAL}}_Handle_t *handle)
{
    if (handle == NULL) {
        return {{PERIPHERAL}}_INVALID_PARAM;
    }

    handle->isInitialized = false;
    return {{PERIPHERAL}}_OK;
}

{{PERIPHERAL}}_Status_t {{PERIPHERAL}}_Transmit({{PERIPHERAL}}_Handle_t *handle, const uint8_t *data, uint16_t len, uint32_t timeout)
{
    if (handle == NULL || data == NULL) {
        return {{PERIPHERAL}}_INVALID_PARAM;
    }
    if (!handle->isInitialized) {
        return {{PERIPHERAL}}_ERROR;
    }
    if (handle->isBusy) {
        return {{PERIPHERAL}}_BUSY;
    }

    handle->isBusy = true;
    /* {{TRANSFER_MODE}} transfer of len bytes */
    handle->isBusy = false;
    return {{PERIPHERAL}}_OK;
}

{{PERIPHERAL}}_Status_t {{PERIPHERAL}}_Receive({{PERIPHERAL}}_Handle_t *handle, uint8_t *data, uint16_t len, uint32_t timeout)
{
    if (handle == NULL || data == NULL) {
        return {{PERIPHERAL}}_INVALID_PARAM;
    }
    if (!handle->isInitialized) {
        return {{PERIPHERAL}}_ERROR;
    }
    if (handle->isBusy) {
        return {{PERIPHERAL}}_BUSY;
    }

    handle->isBusy = true;
    /* {{TRANSFER_MODE}} transfer of len bytes */
    handle->isBusy = false;
    return {{PERIPHERAL}}_OK;
}
"#;

pub const TEMPLATE_DRIVER_CONFIG: &str = r#"{{! Peripheral configuration structure and defaults }}
/**
 * {{PERIPHERAL}} Configuration Header
 * Generated for {{MCU}}
 */

#ifndef __{{upper PERIPHERAL}}_CONFIG_H
#define __{{upper PERIPHERAL}}_CONFIG_H

#include <stdint.h>
#include <stdbool.h>

typedef struct {
    uint32_t mode;           /* Operating mode */
    uint32_t speed;          /* Clock speed */
    bool useDma;             /* Use DMA transfers */
    bool useInterrupts;      /* Use interrupts */
} {{PERIPHERAL}}_Config_t;

#define {{PERIPHERAL}}_DEFAULT_CONFIG { \
    .mode = 0, \
    .speed = {{SPEED}}, \
    .useDma = {{USE_DMA}}, \
    .useInterrupts = {{USE_INTERRUPTS}}, \
}

#endif /* __{{upper PERIPHERAL}}_CONFIG_H */
"#;

pub const TEMPLATE_DRIVER_EXAMPLE: &str = r#"{{! Peripheral usage example }}
/**
 * {{PERIPHERAL}} Usage Example
 * Generated for {{MCU}}
 */

#include "{{snake PERIPHERAL}}_driver.h"

static {{PERIPHERAL}}_Handle_t h{{lower PERIPHERAL}};

void {{pascal PERIPHERAL}}_Example_Init(void)
{
    {{PERIPHERAL}}_Config_t config = {{PERIPHERAL}}_DEFAULT_CONFIG;

    if ({{PERIPHERAL}}_Init(&h{{lower PERIPHERAL}}, &config) != {{PERIPHERAL}}_OK) {
        while (1);
    }
}

void {{pascal PERIPHERAL}}_Example_Run(void)
{
    uint8_t txData[] = "Hello STM32N6!";
    uint8_t rxData[32];

    {{PERIPHERAL}}_Transmit(&h{{lower PERIPHERAL}}, txData, sizeof(txData), 1000);
    {{PERIPHERAL}}_Receive(&h{{lower PERIPHERAL}}, rxData, sizeof(rxData), 1000);
}
"#;

pub const TEMPLATE_CLOCK_SOURCE: &str = r#"{{! System clock tree setup }}
/**
 * Clock Configuration Source
 * Generated for {{MCU}}
 * Target SYSCLK: {{SYSCLK_MHZ}} MHz
 */

#include "clock_config.h"
#include "stm32n6xx.h"

uint32_t SystemCoreClock = {{SYSCLK}}UL;
uint32_t HCLK_Frequency = {{HCLK}}UL;
uint32_t PCLK1_Frequency = {{PCLK1}}UL;
uint32_t PCLK2_Frequency = {{PCLK2}}UL;

void SystemClock_Config(void)
{
    __HAL_RCC_PWR_CLK_ENABLE();
    __HAL_PWR_VOLTAGESCALING_CONFIG(PWR_REGULATOR_VOLTAGE_SCALE0);
    while ((PWR->VOSR & PWR_VOSR_VOSRDY) == 0);

    /* Source: {{SOURCE}} */
    /* M = {{PLL_M}}, N = {{PLL_N}}, P = {{PLL_P}} */
    RCC->PLL1DIVR = (({{PLL_N}} - 1) << RCC_PLL1DIVR_N1_Pos) |
                    (({{PLL_P}} - 1) << RCC_PLL1DIVR_P1_Pos);

    RCC->PLL1CFGR = RCC_PLL1CFGR_PLL1RGE_1 |
                    RCC_PLL1CFGR_PLL1SRC_{{PLL_SOURCE}};

    RCC->CR |= RCC_CR_PLL1ON;
    while ((RCC->CR & RCC_CR_PLL1RDY) == 0);

    /* AHB = /{{AHB_DIV}}, APB1 = /{{APB1_DIV}}, APB2 = /{{APB2_DIV}}, APB3 = /{{APB3_DIV}} */

    RCC->CFGR &= ~RCC_CFGR_SW;
    RCC->CFGR |= RCC_CFGR_SW_PLL1;
    while ((RCC->CFGR & RCC_CFGR_SWS) != RCC_CFGR_SWS_PLL1);

    SystemCoreClock = {{SYSCLK}}UL;
    HCLK_Frequency = {{HCLK}}UL;
    PCLK1_Frequency = {{PCLK1}}UL;
    PCLK2_Frequency = {{PCLK2}}UL;
}

void SystemCoreClockUpdate(void)
{
    uint32_t hsi = 64000000UL;
    uint32_t hse = {{HSE_VALUE}}UL;
    uint32_t sws = (RCC->CFGR & RCC_CFGR_SWS) >> RCC_CFGR_SWS_Pos;

    switch (sws) {
        case 0:
            SystemCoreClock = hsi;
            break;
        case 1:
            SystemCoreClock = hse;
            break;
        case 2:
            SystemCoreClock = {{SYSCLK}}UL;
            break;
        default:
            SystemCoreClock = hsi;
            break;
    }
}
"#;

pub const TEMPLATE_CLOCK_HEADER: &str = r#"{{! Clock frequency definitions and prototypes }}
/**
 * Clock Configuration Header
 * Generated for {{MCU}}
 */

#ifndef __CLOCK_CONFIG_H
#define __CLOCK_CONFIG_H

#include <stdint.h>

#define SYSCLK_FREQ         {{SYSCLK}}UL
#define HCLK_FREQ           {{HCLK}}UL
#define PCLK1_FREQ          {{PCLK1}}UL
#define PCLK2_FREQ          {{PCLK2}}UL
#define PCLK3_FREQ          {{PCLK3}}UL

#define HSE_VALUE           {{HSE_VALUE}}UL
#define HSI_VALUE           64000000UL

#define PLL1_M              {{PLL_M}}
#define PLL1_N              {{PLL_N}}
#define PLL1_P              {{PLL_P}}
#define PLL1_Q              {{PLL_Q}}
#define PLL1_R              {{PLL_R}}

extern uint32_t SystemCoreClock;
extern uint32_t HCLK_Frequency;
extern uint32_t PCLK1_Frequency;
extern uint32_t PCLK2_Frequency;

void SystemClock_Config(void);
void SystemCoreClockUpdate(void);

#endif /* __CLOCK_CONFIG_H */
"#;

/// Names of the built-in templates
pub mod names {
    pub const DRIVER_HEADER: &str = "peripheral/driver_header";
    pub const DRIVER_SOURCE: &str = "peripheral/driver_source";
    pub const DRIVER_CONFIG: &str = "peripheral/driver_config";
    pub const DRIVER_EXAMPLE: &str = "peripheral/example";
    pub const CLOCK_SOURCE: &str = "clock/clock_config_c";
    pub const CLOCK_HEADER: &str = "clock/clock_config_h";
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        match Regex::new(r"\{\{\s*(?:(upper|lower|camel|pascal|snake)\s+)?([A-Za-z_][A-Za-z0-9_]*)\s*\}\}") {
            Ok(re) => re,
            Err(_) => unreachable!("static regex pattern is valid"),
        }
    })
}

fn comment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| match Regex::new(r"\{\{!\s*(.*?)\s*\}\}\n?") {
        Ok(re) => re,
        Err(_) => unreachable!("static regex pattern is valid"),
    })
}

/// Substitute placeholders in a template string
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let without_comments = comment_regex().replace_all(template, "");
    placeholder_regex()
        .replace_all(&without_comments, |caps: &Captures| {
            let Some((_, value)) = vars.iter().find(|(key, _)| *key == &caps[2]) else {
                return caps[0].to_string();
            };
            match caps.get(1).map(|m| m.as_str()) {
                Some("upper") => value.to_uppercase(),
                Some("lower") => value.to_lowercase(),
                Some("camel") => camel_case(value),
                Some("pascal") => pascal_case(value),
                Some("snake") => snake_case(value),
                _ => value.to_string(),
            }
        })
        .into_owned()
}

/// Variable names referenced by a template, in order of first appearance
pub fn extract_variables(template: &str) -> Vec<String> {
    let mut variables: Vec<String> = Vec::new();
    for caps in placeholder_regex().captures_iter(template) {
        let name = &caps[2];
        if !variables.iter().any(|v| v == name) {
            variables.push(name.to_string());
        }
    }
    variables
}

/// Text of the first `{{! ... }}` comment
pub fn extract_description(template: &str) -> String {
    comment_regex()
        .captures(template)
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| "No description".to_string())
}

fn join_words(value: &str, capitalize_first: bool) -> String {
    let mut out = String::with_capacity(value.len());
    let mut upper_next = false;
    for c in value.chars() {
        if c == '-' || c == '_' || c.is_whitespace() {
            upper_next = true;
            continue;
        }
        if out.is_empty() {
            if capitalize_first {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
        } else if upper_next {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        upper_next = false;
    }
    out
}

/// `spi_bus-name` → `spiBusName`
pub fn camel_case(value: &str) -> String {
    join_words(value, false)
}

/// `spi_bus-name` → `SpiBusName`
pub fn pascal_case(value: &str) -> String {
    join_words(value, true)
}

/// `spiBus Name` → `spi_bus_name`
pub fn snake_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 4);
    let mut prev_lower = false;
    for c in value.chars() {
        if c == '-' || c.is_whitespace() {
            out.push('_');
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower {
            out.push('_');
        }
        prev_lower = c.is_lowercase();
        out.extend(c.to_lowercase());
    }
    out
}

/// Metadata about a registered template
#[derive(Debug, Clone, Serialize)]
pub struct TemplateInfo {
    pub name: String,
    pub category: String,
    pub description: String,
    pub variables: Vec<String>,
}

struct Template {
    content: String,
    info: TemplateInfo,
}

/// Registry of named templates
#[derive(Default)]
pub struct TemplateEngine {
    templates: BTreeMap<String, Template>,
}

impl TemplateEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine preloaded with the peripheral and clock templates
    pub fn with_builtins() -> Self {
        let mut engine = Self::new();
        engine.register(names::DRIVER_HEADER, TEMPLATE_DRIVER_HEADER);
        engine.register(names::DRIVER_SOURCE, TEMPLATE_DRIVER_SOURCE);
        engine.register(names::DRIVER_CONFIG, TEMPLATE_DRIVER_CONFIG);
        engine.register(names::DRIVER_EXAMPLE, TEMPLATE_DRIVER_EXAMPLE);
        engine.register(names::CLOCK_SOURCE, TEMPLATE_CLOCK_SOURCE);
        engine.register(names::CLOCK_HEADER, TEMPLATE_CLOCK_HEADER);
        engine
    }

    /// Register or replace a template. The category is the name's first path segment.
    pub fn register(&mut self, name: &str, content: &str) {
        let category = match name.split_once('/') {
            Some((category, _)) => category.to_string(),
            None => "general".to_string(),
        };
        let info = TemplateInfo {
            name: name.to_string(),
            category,
            description: extract_description(content),
            variables: extract_variables(content),
        };
        self.templates.insert(
            name.to_string(),
            Template {
                content: content.to_string(),
                info,
            },
        );
    }

    pub fn render(&self, name: &str, vars: &[(&str, &str)]) -> Result<String, CapabilityError> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| CapabilityError::Template(format!("Template not found: {}", name)))?;
        Ok(render(&template.content, vars))
    }

    pub fn has(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn list_all(&self) -> Vec<TemplateInfo> {
        self.templates.values().map(|t| t.info.clone()).collect()
    }

    pub fn info(&self, name: &str) -> Option<&TemplateInfo> {
        self.templates.get(name).map(|t| &t.info)
    }
}
