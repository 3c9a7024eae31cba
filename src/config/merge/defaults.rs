use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with the lowest-precedence defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("engine.omni_id", crate::config::DEFAULT_OMNI_ID)?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")?
        .set_default("logging.output", "stdout")
}
