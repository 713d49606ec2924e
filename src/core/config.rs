//! Block configuration parsing
//!
//! A ```rive block carries a small line-oriented configuration language:
//! `key: value` or `key=value` pairs, plus a bare `path/to/file.riv` line as
//! shorthand for `src`. Parsing is total — malformed values are dropped, not
//! rejected — and the result is assembled fresh per render pass from three
//! layers: settings defaults, frontmatter overrides, then the block's own
//! lines.

use std::collections::BTreeMap;

use regex_lite::Regex;

use crate::core::settings::PluginSettings;
use crate::runtime::backend::RendererBackend;
use crate::runtime::instance::Layout;

/// File extension that marks a bare line as an asset reference.
pub const ASSET_EXTENSION: &str = ".riv";

/// Fully merged configuration for one rendered block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockConfig {
    /// Asset reference; empty when the block never provided one.
    pub src: String,
    pub autoplay: bool,
    pub loop_animation: bool,
    /// Artboard to select, `None` for the asset default.
    pub artboard: Option<String>,
    /// State machines to start, deduplicated in first-seen order.
    pub state_machines: Vec<String>,
    /// Animations to play, deduplicated in first-seen order.
    pub animations: Vec<String>,
    /// Requested backend; the settings default (canvas unless configured
    /// otherwise) when the block names none.
    pub renderer: RendererBackend,
    /// Raw fit string, mapped to the runtime enum at construction time.
    pub fit: Option<String>,
    /// Raw alignment string, mapped to the runtime enum at construction time.
    pub alignment: Option<String>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    /// Width/height ratio. Derived from `width`/`height` when both are given.
    pub ratio: Option<f32>,
    /// Base directory joined in front of relative `src` references.
    pub assets_base: Option<String>,
    pub show_controls: bool,
    /// Unrecognized keys, retained but ignored downstream.
    pub extras: BTreeMap<String, String>,
}

impl BlockConfig {
    /// Runtime layout mapped from the raw fit/alignment strings.
    pub fn layout(&self) -> Layout {
        Layout::from_config(self.fit.as_deref(), self.alignment.as_deref())
    }
}

/// Defaults layered under frontmatter and block lines.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDefaults {
    pub autoplay: bool,
    pub loop_animation: bool,
    pub renderer: RendererBackend,
    pub assets_base: Option<String>,
}

impl Default for ConfigDefaults {
    fn default() -> Self {
        Self {
            autoplay: true,
            loop_animation: true,
            renderer: RendererBackend::Canvas,
            assets_base: None,
        }
    }
}

impl From<&PluginSettings> for ConfigDefaults {
    fn from(settings: &PluginSettings) -> Self {
        Self {
            autoplay: settings.default_autoplay,
            loop_animation: settings.default_loop,
            renderer: settings.default_renderer,
            assets_base: settings.assets_base.clone(),
        }
    }
}

/// Parse block text against defaults. Total: never fails, never panics on
/// user input, and repeated parses of the same text agree.
pub fn parse(text: &str, defaults: &ConfigDefaults) -> BlockConfig {
    parse_with_overrides(text, &BTreeMap::new(), defaults)
}

/// Parse with frontmatter overrides applied between defaults and block lines
/// (block wins over frontmatter, frontmatter wins over defaults).
pub fn parse_with_overrides(
    text: &str,
    frontmatter: &BTreeMap<String, String>,
    defaults: &ConfigDefaults,
) -> BlockConfig {
    let mut raw = RawConfig::default();

    for (key, value) in frontmatter {
        raw.apply(key, value);
    }

    let line_re = Regex::new(r"^(\w+)\s*[:=]\s*(.+)$").unwrap();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(caps) = line_re.captures(line) {
            let key = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let value = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            raw.apply(key, value);
        } else if raw.src.is_none() && line.ends_with(ASSET_EXTENSION) {
            raw.src = Some(line.to_string());
        }
    }

    raw.finish(defaults)
}

/// Accumulates raw field values before the defaults merge.
#[derive(Debug, Default)]
struct RawConfig {
    src: Option<String>,
    autoplay: Option<bool>,
    loop_animation: Option<bool>,
    artboard: Option<String>,
    state_machines: Vec<String>,
    animations: Vec<String>,
    renderer: Option<RendererBackend>,
    fit: Option<String>,
    alignment: Option<String>,
    width: Option<f32>,
    height: Option<f32>,
    ratio: Option<f32>,
    assets_base: Option<String>,
    show_controls: Option<bool>,
    extras: BTreeMap<String, String>,
}

impl RawConfig {
    fn apply(&mut self, key: &str, value: &str) {
        match normalize_key(key).as_str() {
            "src" => self.src = Some(value.to_string()),
            "autoplay" => {
                if let Some(b) = parse_bool(value) {
                    self.autoplay = Some(b);
                }
            }
            "loop" => {
                if let Some(b) = parse_bool(value) {
                    self.loop_animation = Some(b);
                }
            }
            "artboard" => self.artboard = Some(value.to_string()),
            "statemachine" | "statemachines" => push_list(&mut self.state_machines, value),
            "animation" | "animations" => push_list(&mut self.animations, value),
            "renderer" => {
                if let Some(backend) = RendererBackend::from_name(value) {
                    self.renderer = Some(backend);
                }
            }
            "fit" => self.fit = Some(value.to_string()),
            "alignment" => self.alignment = Some(value.to_string()),
            "width" => {
                if let Some(v) = parse_positive(value) {
                    self.width = Some(v);
                }
            }
            "height" => {
                if let Some(v) = parse_positive(value) {
                    self.height = Some(v);
                }
            }
            "ratio" => {
                if let Some(v) = parse_ratio(value) {
                    self.ratio = Some(v);
                }
            }
            "assetsbase" => self.assets_base = Some(value.to_string()),
            "controls" | "showcontrols" => match value.trim().to_ascii_lowercase().as_str() {
                "false" | "off" | "0" | "none" => self.show_controls = Some(false),
                "true" | "on" | "1" => self.show_controls = Some(true),
                _ => {}
            },
            "ui" => {
                if matches!(
                    value.trim().to_ascii_lowercase().as_str(),
                    "none" | "minimal" | "off"
                ) {
                    self.show_controls = Some(false);
                }
            }
            "minimal" => {
                if parse_bool(value) == Some(true) {
                    self.show_controls = Some(false);
                }
            }
            _ => {
                self.extras.insert(key.to_string(), value.to_string());
            }
        }
    }

    fn finish(self, defaults: &ConfigDefaults) -> BlockConfig {
        // Both dimensions present: ratio is derived, not independently set.
        let ratio = match (self.width, self.height) {
            (Some(w), Some(h)) => Some(w / h),
            _ => self.ratio,
        };

        BlockConfig {
            src: self.src.unwrap_or_default(),
            autoplay: self.autoplay.unwrap_or(defaults.autoplay),
            loop_animation: self.loop_animation.unwrap_or(defaults.loop_animation),
            artboard: self.artboard,
            state_machines: dedup_first_seen(self.state_machines),
            animations: dedup_first_seen(self.animations),
            renderer: self.renderer.unwrap_or(defaults.renderer),
            fit: self.fit,
            alignment: self.alignment,
            width: self.width,
            height: self.height,
            ratio,
            assets_base: self.assets_base.or_else(|| defaults.assets_base.clone()),
            show_controls: self.show_controls.unwrap_or(true),
            extras: self.extras,
        }
    }
}

/// Lowercase and strip underscores so `stateMachine`, `statemachine` and
/// `state_machine` all address the same field.
fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Finite, strictly positive number or nothing.
fn parse_positive(value: &str) -> Option<f32> {
    value
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

/// `A/B` fraction or a plain decimal.
fn parse_ratio(value: &str) -> Option<f32> {
    if let Some((num, den)) = value.split_once('/') {
        let num = parse_positive(num)?;
        let den = parse_positive(den)?;
        return Some(num / den).filter(|v| v.is_finite() && *v > 0.0);
    }
    parse_positive(value)
}

fn push_list(list: &mut Vec<String>, value: &str) {
    for item in value.split(',') {
        let item = item.trim();
        if !item.is_empty() {
            list.push(item.to_string());
        }
    }
}

fn dedup_first_seen(items: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(items.len());
    for item in items {
        if !seen.contains(&item) {
            seen.push(item);
        }
    }
    seen
}
