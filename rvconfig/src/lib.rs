//! Typed simulator configuration (4.L): a `VmConfig` struct plus a small
//! `INI`-style parser, grounded on `original_source/include/config.h`'s
//! `vm_config::VmConfig`/`modifyConfig`. File discovery and watching are
//! the external command shell's job; this crate only turns text into a
//! validated struct.

use rvcore::constants::{
    DEFAULT_BLOCK_SIZE, DEFAULT_BSS_SECTION_START, DEFAULT_DATA_SECTION_START,
    DEFAULT_INSTRUCTION_EXECUTION_LIMIT, DEFAULT_MEMORY_SIZE, DEFAULT_TEXT_SECTION_START,
};

const SECTION_VM: &str = "vm";

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ProcessorType {
    SingleStage,
    MultiStage,
}

#[derive(Clone, Copy, Debug)]
pub struct VmConfig {
    pub processor_type: ProcessorType,
    pub run_step_delay_ms: u64,
    pub instruction_execution_limit: u64,
    pub memory_size: u64,
    pub memory_block_size: u64,
    pub data_section_start: u64,
    pub text_section_start: u64,
    pub bss_section_start: u64,
    pub m_extension_enabled: bool,
    pub f_extension_enabled: bool,
    pub d_extension_enabled: bool,
}

impl Default for VmConfig {
    fn default() -> VmConfig {
        VmConfig {
            processor_type: ProcessorType::SingleStage,
            run_step_delay_ms: 0,
            instruction_execution_limit: DEFAULT_INSTRUCTION_EXECUTION_LIMIT,
            memory_size: DEFAULT_MEMORY_SIZE,
            memory_block_size: DEFAULT_BLOCK_SIZE,
            data_section_start: DEFAULT_DATA_SECTION_START,
            text_section_start: DEFAULT_TEXT_SECTION_START,
            bss_section_start: DEFAULT_BSS_SECTION_START,
            m_extension_enabled: true,
            f_extension_enabled: true,
            d_extension_enabled: true,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown configuration section \"{0}\"")]
    UnknownSection(String),
    #[error("unknown configuration key \"{key}\" in section \"{section}\"")]
    UnknownKey { section: String, key: String },
    #[error("invalid value \"{value}\" for \"{key}\"")]
    InvalidValue { key: String, value: String },
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue { key: key.to_string(), value: value.to_string() }),
    }
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    let value = value.trim();
    let parsed = if let Some(hex) = value.strip_prefix("0x") {
        u64::from_str_radix(hex, 16)
    } else {
        value.parse::<u64>()
    };
    parsed.map_err(|_| ConfigError::InvalidValue { key: key.to_string(), value: value.to_string() })
}

/// Parses the `[Section]` / `key = value` textual format, applying each
/// recognized key the way `VmConfig::modifyConfig` does.
pub fn parse_ini(text: &str) -> Result<VmConfig, ConfigError> {
    let mut config = VmConfig::default();
    let mut section = String::new();

    for raw_line in text.lines() {
        let line = raw_line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            if name != SECTION_VM {
                return Err(ConfigError::UnknownSection(name.to_string()));
            }
            section = name.to_string();
            continue;
        }
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidValue { key: line.to_string(), value: String::new() })?;
        let key = key.trim();
        let value = value.trim();

        if section != SECTION_VM {
            return Err(ConfigError::UnknownKey { section: section.clone(), key: key.to_string() });
        }

        match key {
            "processor_type" => {
                config.processor_type = match value {
                    "single_stage" => ProcessorType::SingleStage,
                    "multi_stage" => ProcessorType::MultiStage,
                    _ => return Err(ConfigError::InvalidValue { key: key.to_string(), value: value.to_string() }),
                };
            }
            "run_step_delay" => config.run_step_delay_ms = parse_u64(key, value)?,
            "instruction_execution_limit" => config.instruction_execution_limit = parse_u64(key, value)?,
            "memory_size" => config.memory_size = parse_u64(key, value)?,
            "memory_block_size" => config.memory_block_size = parse_u64(key, value)?,
            "data_section_start" => config.data_section_start = parse_u64(key, value)?,
            "text_section_start" => config.text_section_start = parse_u64(key, value)?,
            "bss_section_start" => config.bss_section_start = parse_u64(key, value)?,
            "m_extension_enabled" => config.m_extension_enabled = parse_bool(key, value)?,
            "f_extension_enabled" => config.f_extension_enabled = parse_bool(key, value)?,
            "d_extension_enabled" => config.d_extension_enabled = parse_bool(key, value)?,
            other => {
                return Err(ConfigError::UnknownKey { section: section.clone(), key: other.to_string() })
            }
        }
    }

    Ok(config)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let config = VmConfig::default();
        assert_eq!(config.memory_block_size, DEFAULT_BLOCK_SIZE);
        assert_eq!(config.data_section_start, DEFAULT_DATA_SECTION_START);
        assert!(config.m_extension_enabled);
    }

    #[test]
    fn parses_recognized_keys() {
        let text = "[vm]\ninstruction_execution_limit = 500\nmemory_size = 0x1000\nf_extension_enabled = false\n";
        let config = parse_ini(text).unwrap();
        assert_eq!(config.instruction_execution_limit, 500);
        assert_eq!(config.memory_size, 0x1000);
        assert!(!config.f_extension_enabled);
    }

    #[test]
    fn unknown_section_is_an_error() {
        assert!(parse_ini("[bogus]\nkey = 1\n").is_err());
    }

    #[test]
    fn unknown_key_is_an_error() {
        assert!(parse_ini("[vm]\nnot_a_real_key = 1\n").is_err());
    }

    #[test]
    fn invalid_value_is_an_error() {
        assert!(parse_ini("[vm]\nmemory_size = not_a_number\n").is_err());
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let text = "# a comment\n\n[vm]\n# another comment\nrun_step_delay = 10\n";
        let config = parse_ini(text).unwrap();
        assert_eq!(config.run_step_delay_ms, 10);
    }
}
