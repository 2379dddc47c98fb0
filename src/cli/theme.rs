use crate::config::{
    HexColor, StyleOverride, ThemeConfig as UserThemeConfig, ThemeModifier, ThemePreset, ThemeToken,
};
use ratatui::style::{Color, Modifier, Style};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Theme {
    enabled: bool,
    styles: HashMap<ThemeToken, Style>,
}

impl Theme {
    pub fn new(enabled: bool) -> Self {
        Self::from_config(enabled, &UserThemeConfig::default())
    }

    pub fn from_config(enabled: bool, config: &UserThemeConfig) -> Self {
        let mut styles: HashMap<ThemeToken, Style> = ThemeToken::all()
            .iter()
            .map(|&token| (token, preset_style(config.preset, token)))
            .collect();
        for (token, override_style) in &config.styles {
            let base = styles.get(token).copied().unwrap_or_default();
            styles.insert(*token, merge_style(base, override_style));
        }

        Self { enabled, styles }
    }

    pub fn style(&self, token: ThemeToken) -> Style {
        if !self.enabled {
            return plain_style(token);
        }

        self.styles.get(&token).copied().unwrap_or_default()
    }
}

/// Foreground palette per preset, indexed by role.
struct Palette {
    user: Color,
    text: Color,
    assistant: Color,
    accent: Color,
    muted: Color,
    error: Color,
    marker: Color,
    input_fg: Color,
    input_bg: Color,
}

const DEFAULT_PALETTE: Palette = Palette {
    user: Color::Rgb(122, 162, 247),
    text: Color::White,
    assistant: Color::Rgb(115, 218, 202),
    accent: Color::Rgb(224, 175, 104),
    muted: Color::Rgb(86, 95, 137),
    error: Color::Rgb(247, 118, 142),
    marker: Color::Rgb(255, 99, 71),
    input_fg: Color::White,
    input_bg: Color::Rgb(22, 22, 30),
};

const LIGHT_PALETTE: Palette = Palette {
    user: Color::Rgb(31, 111, 235),
    text: Color::Rgb(36, 41, 47),
    assistant: Color::Rgb(5, 80, 90),
    accent: Color::Rgb(130, 70, 0),
    muted: Color::Rgb(80, 90, 110),
    error: Color::Rgb(176, 0, 32),
    marker: Color::Rgb(200, 40, 20),
    input_fg: Color::Rgb(36, 41, 47),
    input_bg: Color::Rgb(246, 248, 250),
};

const HIGH_CONTRAST_PALETTE: Palette = Palette {
    user: Color::Rgb(135, 206, 250),
    text: Color::Rgb(255, 255, 255),
    assistant: Color::Rgb(0, 255, 127),
    accent: Color::Rgb(255, 215, 0),
    muted: Color::Rgb(220, 220, 220),
    error: Color::Rgb(255, 64, 64),
    marker: Color::Rgb(255, 0, 0),
    input_fg: Color::Rgb(255, 255, 255),
    input_bg: Color::Rgb(0, 0, 0),
};

fn preset_style(preset: ThemePreset, token: ThemeToken) -> Style {
    let palette = match preset {
        ThemePreset::Default => &DEFAULT_PALETTE,
        ThemePreset::Light => &LIGHT_PALETTE,
        ThemePreset::HighContrast => &HIGH_CONTRAST_PALETTE,
    };

    let fg = |color| Style::default().fg(color);
    match token {
        ThemeToken::UserLabel => fg(palette.user).add_modifier(Modifier::BOLD),
        ThemeToken::UserText => fg(palette.text),
        ThemeToken::AssistantLabel => fg(palette.assistant).add_modifier(Modifier::BOLD),
        ThemeToken::AssistantText => fg(palette.assistant),
        ThemeToken::AssistantWaiting => fg(palette.muted).add_modifier(Modifier::ITALIC),
        ThemeToken::Heading => fg(palette.accent).add_modifier(Modifier::BOLD),
        ThemeToken::Code => fg(palette.accent),
        ThemeToken::Link => fg(palette.user).add_modifier(Modifier::UNDERLINED),
        ThemeToken::Quote => fg(palette.muted).add_modifier(Modifier::ITALIC),
        ThemeToken::MapMarker => fg(palette.marker).add_modifier(Modifier::BOLD),
        ThemeToken::SystemInfo | ThemeToken::Status => fg(palette.muted),
        ThemeToken::SystemError => fg(palette.error).add_modifier(Modifier::BOLD),
        ThemeToken::InputBlock => Style::default().fg(palette.input_fg).bg(palette.input_bg),
    }
}

/// Without colors only structure survives: labels and headings stay bold.
fn plain_style(token: ThemeToken) -> Style {
    match token {
        ThemeToken::UserLabel | ThemeToken::AssistantLabel | ThemeToken::Heading => {
            Style::default().add_modifier(Modifier::BOLD)
        }
        _ => Style::default(),
    }
}

fn merge_style(base: Style, override_style: &StyleOverride) -> Style {
    let mut merged = base;

    if let Some(fg) = override_style.fg {
        merged = merged.fg(color_from_hex(fg));
    }

    if let Some(bg) = override_style.bg {
        merged = merged.bg(color_from_hex(bg));
    }

    if let Some(modifiers) = &override_style.modifiers {
        let replacement = modifiers
            .iter()
            .fold(Modifier::empty(), |acc, &modifier| acc | to_modifier(modifier));
        merged = merged
            .remove_modifier(Modifier::all())
            .add_modifier(replacement);
    }

    merged
}

fn color_from_hex(color: HexColor) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}

fn to_modifier(modifier: ThemeModifier) -> Modifier {
    match modifier {
        ThemeModifier::Bold => Modifier::BOLD,
        ThemeModifier::Dim => Modifier::DIM,
        ThemeModifier::Italic => Modifier::ITALIC,
        ThemeModifier::Underlined => Modifier::UNDERLINED,
        ThemeModifier::Reversed => Modifier::REVERSED,
        ThemeModifier::CrossedOut => Modifier::CROSSED_OUT,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::Theme;
    use crate::config::{
        HexColor, StyleOverride, ThemeConfig, ThemeModifier, ThemePreset, ThemeToken,
    };
    use ratatui::style::{Color, Modifier, Style};

    #[test]
    fn every_token_has_a_preset_style() {
        for preset in [
            ThemePreset::Default,
            ThemePreset::Light,
            ThemePreset::HighContrast,
        ] {
            let theme = Theme::from_config(
                true,
                &ThemeConfig {
                    preset,
                    styles: HashMap::new(),
                },
            );
            for &token in ThemeToken::all() {
                assert_ne!(theme.style(token), Style::default(), "{preset:?} {token:?}");
            }
        }
    }

    #[test]
    fn disabled_theme_only_keeps_labels_bold() {
        let theme = Theme::new(false);
        assert!(
            theme
                .style(ThemeToken::UserLabel)
                .add_modifier
                .contains(Modifier::BOLD)
        );
        assert_eq!(theme.style(ThemeToken::MapMarker), Style::default());
    }

    #[test]
    fn partial_override_preserves_unset_fields() {
        let mut config = ThemeConfig::default();
        config.styles.insert(
            ThemeToken::AssistantLabel,
            StyleOverride {
                fg: Some(HexColor { r: 1, g: 2, b: 3 }),
                bg: None,
                modifiers: None,
            },
        );

        let style = Theme::from_config(true, &config).style(ThemeToken::AssistantLabel);
        assert_eq!(style.fg, Some(Color::Rgb(1, 2, 3)));
        assert_eq!(style.add_modifier, Modifier::BOLD);
    }

    #[test]
    fn modifier_override_replaces_preset_modifiers() {
        let mut config = ThemeConfig::default();
        config.styles.insert(
            ThemeToken::Link,
            StyleOverride {
                fg: None,
                bg: None,
                modifiers: Some(vec![ThemeModifier::Italic]),
            },
        );

        let style = Theme::from_config(true, &config).style(ThemeToken::Link);
        assert_eq!(style.add_modifier, Modifier::ITALIC);
        assert!(style.fg.is_some());
    }
}
