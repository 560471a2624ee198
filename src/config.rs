//! Configuration: runtime settings and strategy selection.
//!
//! Settings are read from a TOML file where every field has a default, then
//! overridden by `TRADEBOT_*` environment variables. Strategies are selected by a
//! tagged [`StrategyConfig`] validated when the strategy is built.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::risk::DEFAULT_MAX_PER_TRADE;
use crate::strategies::{BuiltinStrategy, EmaAtr, Rsi};

/// Parameters of the EMA/ATR crossover strategy.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmaAtrConfig {
    /// Fast EMA period.
    pub fast: usize,
    /// Slow EMA period.
    pub slow: usize,
    /// ATR period.
    pub atr: usize,
    /// Reward multiple of the stop distance.
    #[cfg_attr(feature = "serde", serde(alias = "R"))]
    pub r: f64,
}

impl Default for EmaAtrConfig {
    fn default() -> Self {
        Self {
            fast: 9,
            slow: 21,
            atr: 14,
            r: 1.5,
        }
    }
}

/// Parameters of the RSI threshold strategy.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiConfig {
    /// RSI period.
    pub len: usize,
    /// Sell threshold.
    pub overbought: f64,
    /// Buy threshold.
    pub oversold: f64,
    /// Reward multiple of the stop distance.
    #[cfg_attr(feature = "serde", serde(alias = "R"))]
    pub r: f64,
}

impl Default for RsiConfig {
    fn default() -> Self {
        Self {
            len: 14,
            overbought: 70.0,
            oversold: 30.0,
            r: 1.5,
        }
    }
}

/// Strategy selection, tagged by `kind`.
///
/// ```toml
/// [strategy]
/// kind = "rsi"
/// len = 21
/// ```
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(tag = "kind", rename_all = "snake_case")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StrategyConfig {
    /// EMA crossover with ATR stops.
    #[cfg_attr(feature = "serde", serde(alias = "ema"))]
    EmaAtr(EmaAtrConfig),
    /// RSI thresholds.
    Rsi(RsiConfig),
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self::EmaAtr(EmaAtrConfig::default())
    }
}

impl StrategyConfig {
    /// Validates the parameters and builds a fresh strategy with an empty buffer.
    pub fn build(&self) -> Result<BuiltinStrategy> {
        match *self {
            Self::EmaAtr(c) => EmaAtr::new(c.fast, c.slow, c.atr, c.r).map(Into::into),
            Self::Rsi(c) => Rsi::new(c.len, c.overbought, c.oversold, c.r).map(Into::into),
        }
    }

    /// Decodes a loosely-typed parameter map.
    ///
    /// `kind` is case-insensitive; `rsi` selects RSI and anything else, including an
    /// empty string, selects EMA/ATR. Missing keys take their default.
    #[cfg(feature = "serde")]
    pub fn from_loose(kind: &str, args: &serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        let args = ParamMap::new(args);
        match kind.trim().to_ascii_lowercase().as_str() {
            "rsi" => {
                let d = RsiConfig::default();
                Ok(Self::Rsi(RsiConfig {
                    len: args.usize("len", d.len)?,
                    overbought: args.f64("overbought", d.overbought)?,
                    oversold: args.f64("oversold", d.oversold)?,
                    r: args.f64("r", d.r)?,
                }))
            }
            other => {
                if !matches!(other, "" | "ema" | "ema_atr") {
                    tracing::warn!(kind = other, "unknown strategy kind, using ema_atr");
                }
                let d = EmaAtrConfig::default();
                Ok(Self::EmaAtr(EmaAtrConfig {
                    fast: args.usize("fast", d.fast)?,
                    slow: args.usize("slow", d.slow)?,
                    atr: args.usize("atr", d.atr)?,
                    r: args.f64("r", d.r)?,
                }))
            }
        }
    }
}

/// Typed view over a loosely-typed JSON parameter map.
///
/// Keys are matched case-insensitively. Numbers, numeric strings and booleans
/// (`true` = 1) are coerced; `null` counts as missing.
#[cfg(feature = "serde")]
#[derive(Debug, Clone, Copy)]
pub struct ParamMap<'a> {
    inner: &'a serde_json::Map<String, serde_json::Value>,
}

#[cfg(feature = "serde")]
impl<'a> ParamMap<'a> {
    /// Wraps a map.
    pub fn new(inner: &'a serde_json::Map<String, serde_json::Value>) -> Self {
        Self { inner }
    }

    /// Looks up `key`, exact match first.
    pub fn get(&self, key: &str) -> Option<&'a serde_json::Value> {
        self.inner.get(key).or_else(|| {
            self.inner
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })
    }

    /// Reads a float, or `default` when the key is missing.
    pub fn f64(&self, key: &str, default: f64) -> Result<f64> {
        use serde_json::Value;

        let invalid = |v: &Value| Error::InvalidParameters(format!("`{key}` is not a number (got: {v})"));
        match self.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Number(n)) => n.as_f64().ok_or_else(|| invalid(&Value::Number(n.clone()))),
            Some(Value::Bool(b)) => Ok(if *b { 1.0 } else { 0.0 }),
            Some(v @ Value::String(s)) => s.trim().parse().map_err(|_| invalid(v)),
            Some(v) => Err(invalid(v)),
        }
    }

    /// Reads a non-negative integer; fractional values are truncated.
    pub fn usize(&self, key: &str, default: usize) -> Result<usize> {
        if self.get(key).is_none() {
            return Ok(default);
        }
        let value = self.f64(key, default as f64)?;
        if value < 0.0 || !value.is_finite() {
            return Err(Error::InvalidParameters(format!(
                "`{key}` must be a non-negative integer (got: {value})"
            )));
        }
        Ok(value as usize)
    }
}

/// Where candles come from.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Synthetic random-walk feed.
    #[default]
    Paper,
    /// Exchange feed. Not wired in this crate; the binary refuses to start with it.
    Live,
}

/// Risk section.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskSettings {
    /// Cap on the fraction of equity per trade.
    pub max_per_trade: f64,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            max_per_trade: DEFAULT_MAX_PER_TRADE,
        }
    }
}

/// Random feed section.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedSettings {
    /// First close of the random walk.
    pub start_price: f64,
    /// Largest relative move per candle (`0.002` = 0.2%).
    pub volatility: f64,
    /// Number of candles to generate.
    pub candles: usize,
    /// Seed of the generator; random when absent.
    pub seed: Option<u64>,
    /// Delay between two candles, in milliseconds.
    pub pace_ms: u64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            start_price: 64_000.0,
            volatility: 0.002,
            candles: 500,
            seed: None,
            pace_ms: 100,
        }
    }
}

/// Runtime settings of the binary.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Feed mode.
    pub mode: Mode,
    /// Traded symbol.
    pub symbol: String,
    /// Candle timeframe.
    pub timeframe: String,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Starting equity of the paper engine.
    pub paper_equity: f64,
    /// CSV trade log location.
    pub trades_path: String,
    /// Risk section.
    pub risk: RiskSettings,
    /// Strategy section.
    pub strategy: StrategyConfig,
    /// Random feed section.
    pub feed: FeedSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: Mode::Paper,
            symbol: "BTCUSDT".to_owned(),
            timeframe: "1m".to_owned(),
            log_level: "info".to_owned(),
            paper_equity: 10_000.0,
            trades_path: "trades.csv".to_owned(),
            risk: RiskSettings::default(),
            strategy: StrategyConfig::default(),
            feed: FeedSettings::default(),
        }
    }
}

impl Settings {
    /// Loads settings from the TOML file at `path` and applies environment overrides.
    ///
    /// A missing file yields the defaults; an unreadable or malformed one is an error.
    #[cfg(feature = "serde")]
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut settings = match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                Self::default()
            }
            Err(e) => return Err(e.into()),
        };
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Parses settings from TOML text, without environment overrides.
    #[cfg(feature = "serde")]
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Applies `TRADEBOT_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(symbol) = lookup("TRADEBOT_SYMBOL") {
            self.symbol = symbol;
        }
        if let Some(timeframe) = lookup("TRADEBOT_TIMEFRAME") {
            self.timeframe = timeframe;
        }
        if let Some(equity) = lookup("TRADEBOT_EQUITY") {
            self.paper_equity = equity
                .trim()
                .parse()
                .map_err(|_| Error::InvalidParameters(format!("TRADEBOT_EQUITY is not a number (got: {equity})")))?;
        }
        if let Some(path) = lookup("TRADEBOT_TRADES_PATH") {
            self.trades_path = path;
        }
        if let Some(level) = lookup("TRADEBOT_LOG_LEVEL") {
            self.log_level = level;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::Strategy;

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert_eq!(settings.mode, Mode::Paper);
        assert_eq!(settings.symbol, "BTCUSDT");
        assert_eq!(settings.risk.max_per_trade, 0.02);
        assert_eq!(settings.strategy.build().unwrap().name(), "EMA_ATR");
    }

    #[test]
    fn build_validates() {
        let config = StrategyConfig::Rsi(RsiConfig {
            oversold: 80.0,
            ..RsiConfig::default()
        });
        assert!(matches!(config.build(), Err(Error::InvalidParameters(_))));
    }

    #[test]
    fn env_overrides() {
        let mut settings = Settings::default();
        settings
            .apply_overrides(|key| match key {
                "TRADEBOT_SYMBOL" => Some("ETHUSDT".to_owned()),
                "TRADEBOT_EQUITY" => Some(" 2500 ".to_owned()),
                _ => None,
            })
            .unwrap();
        assert_eq!(settings.symbol, "ETHUSDT");
        assert_eq!(settings.paper_equity, 2500.0);
        assert_eq!(settings.timeframe, "1m");

        let result = settings.apply_overrides(|key| (key == "TRADEBOT_EQUITY").then(|| "lots".to_owned()));
        assert!(matches!(result, Err(Error::InvalidParameters(_))));
    }

    #[cfg(feature = "serde")]
    mod serde_backed {
        use serde_json::json;

        use super::*;

        fn map(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
            value.as_object().cloned().unwrap()
        }

        #[test]
        fn toml_partial_file() {
            let settings = Settings::from_toml(
                r#"
                symbol = "SOLUSDT"
                paper_equity = 500.0

                [strategy]
                kind = "rsi"
                len = 21
                R = 2.0

                [feed]
                seed = 7
                "#,
            )
            .unwrap();

            assert_eq!(settings.symbol, "SOLUSDT");
            assert_eq!(settings.timeframe, "1m");
            assert_eq!(
                settings.strategy,
                StrategyConfig::Rsi(RsiConfig {
                    len: 21,
                    r: 2.0,
                    ..RsiConfig::default()
                })
            );
            assert_eq!(settings.feed.seed, Some(7));
            assert_eq!(settings.feed.candles, 500);
        }

        #[test]
        fn toml_bad_value() {
            assert!(matches!(Settings::from_toml("paper_equity = \"many\""), Err(Error::TomlError(_))));
        }

        #[test]
        fn missing_file_gives_defaults() {
            let path = std::env::temp_dir().join("tradebot-does-not-exist.toml");
            let settings = Settings::load(path).unwrap();
            assert_eq!(settings.trades_path, "trades.csv");
        }

        #[test]
        fn loose_params_coerce() {
            let args = map(json!({"FAST": "5", "Slow": 30.0, "atr": 10, "r": true}));
            let config = StrategyConfig::from_loose("EMA", &args).unwrap();
            assert_eq!(
                config,
                StrategyConfig::EmaAtr(EmaAtrConfig {
                    fast: 5,
                    slow: 30,
                    atr: 10,
                    r: 1.0,
                })
            );
        }

        #[test]
        fn loose_params_defaults_and_fallback() {
            let config = StrategyConfig::from_loose("macd", &map(json!({}))).unwrap();
            assert_eq!(config, StrategyConfig::default());

            let config = StrategyConfig::from_loose("RSI", &map(json!({"len": null, "oversold": "25"}))).unwrap();
            assert_eq!(
                config,
                StrategyConfig::Rsi(RsiConfig {
                    oversold: 25.0,
                    ..RsiConfig::default()
                })
            );
        }

        #[test]
        fn loose_params_reject_garbage() {
            let args = map(json!({"fast": "quick"}));
            assert!(matches!(StrategyConfig::from_loose("ema_atr", &args), Err(Error::InvalidParameters(_))));
            let args = map(json!({"len": [14]}));
            assert!(matches!(StrategyConfig::from_loose("rsi", &args), Err(Error::InvalidParameters(_))));
            let args = map(json!({"slow": -3}));
            assert!(matches!(StrategyConfig::from_loose("", &args), Err(Error::InvalidParameters(_))));
        }

        #[test]
        fn huge_periods_fail_to_build() {
            let config = StrategyConfig::from_loose("ema", &map(json!({"fast": 1e30}))).unwrap();
            assert!(matches!(config.build(), Err(Error::InvalidParameters(_))));

            let config = StrategyConfig::from_loose("rsi", &map(json!({"len": "1e30"}))).unwrap();
            assert!(matches!(config.build(), Err(Error::InvalidParameters(_))));
        }
    }
}
