use parley_config::{API_KEY_ENV, Config};
use parley_core::ContextMode;

/// Strategy for displaying configuration information.
///
/// Prints the masked API key, provider settings, session settings and the
/// available context modes.
#[derive(Debug, Clone, Copy)]
pub struct InfoStrategy;

impl super::CommandStrategy for InfoStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let gemini = &config.providers.gemini;

        println!("=== parley Configuration ===\n");

        println!("Config file: {}", Config::config_path()?.display());
        println!();

        println!("Gemini:");
        match gemini.api_key() {
            Ok(key) => println!("  API Key: {}", mask_api_key(key)),
            Err(_) => println!("  API Key: (not set, use {API_KEY_ENV} or 'parley init')"),
        }
        println!("  Model: {}", gemini.model);
        println!("  Base URL: {}", gemini.base_url);
        println!();

        println!("Session:");
        println!(
            "  Max Context Length: {}",
            config.session.max_context_length
        );
        println!("  Default Mode: {}", config.session.default_mode);
        match config.session.dispatch_timeout() {
            Some(timeout) => println!("  Dispatch Timeout: {}s", timeout.as_secs()),
            None => println!("  Dispatch Timeout: (none)"),
        }
        println!();

        println!("Context Modes:");
        for mode in ContextMode::KNOWN {
            let instruction = mode.instruction();
            if instruction.is_empty() {
                println!("  {mode}");
            } else {
                println!("  {mode}: {instruction}");
            }
        }

        Ok(())
    }
}

fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_api_key() {
        assert_eq!(mask_api_key("AIzaSyExample1234"), "AIza...1234");
        assert_eq!(mask_api_key("short"), "***");
    }
}
