use super::{
    phrases::{PhrasePicker, Phrases},
    vibes::VibeTable,
};
use crate::{config::ShoutoutConfig, ShoutoutError};

const ELLIPSIS: &str = "...";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileSummary {
    pub display_name: String,
    pub login: String,
    pub id: String,
    /// Already trimmed; may be empty.
    pub about: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChannelState {
    pub game: Option<String>,
    pub is_live: bool,
    pub live_title: Option<String>,
}

/// Recent video and clip titles. Only read for vibe matching.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MediaTitles {
    pub videos: Vec<String>,
    pub clips: Vec<String>,
}

pub struct ShoutoutComposer {
    config: ShoutoutConfig,
    vibes: VibeTable,
    phrases: PhrasePicker,
}

impl ShoutoutComposer {
    pub fn new(config: ShoutoutConfig) -> Result<Self, ShoutoutError> {
        let phrases = PhrasePicker::from_config(&config);
        Self::with_phrases(config, phrases)
    }

    pub fn with_phrases(
        config: ShoutoutConfig,
        phrases: PhrasePicker,
    ) -> Result<Self, ShoutoutError> {
        let vibes = VibeTable::new(&config.vibes, &config.default_vibe)?;
        Ok(Self {
            config,
            vibes,
            phrases,
        })
    }

    pub fn config(&self) -> &ShoutoutConfig {
        &self.config
    }

    /// Builds the shoutout, never longer than `max_length` characters.
    pub fn compose(
        &self,
        profile: &ProfileSummary,
        channel: &ChannelState,
        media: &MediaTitles,
    ) -> String {
        self.compose_with(self.phrases.pick_all(), profile, channel, media)
    }

    pub fn compose_with(
        &self,
        phrases: Phrases,
        profile: &ProfileSummary,
        channel: &ChannelState,
        media: &MediaTitles,
    ) -> String {
        let max = self.config.max_length;
        let about = profile.about.trim();

        let mut texts = vec![about];
        texts.extend(media.videos.iter().map(String::as_str));
        texts.extend(media.clips.iter().map(String::as_str));
        let vibes = self.vibes.classify(&texts).join(", ");

        let url = format!(
            "{}/{}",
            self.config.platform_url.trim_end_matches('/'),
            profile.login
        );

        let intro = phrases.intro.replace("{name}", &profile.display_name);
        let theme = format!("They bring {vibes}.");
        let channel_full = self.channel_line(channel, true);
        let closing = phrases.closing.replace("{url}", &url);
        let quote = |text: &str| phrases.about.replace("{about}", text);

        let (about_text, cuttable) = if about.is_empty() {
            (self.config.default_about.as_str(), false)
        } else {
            (about, true)
        };

        let message = assemble(&[
            intro.as_str(),
            theme.as_str(),
            channel_full.as_str(),
            quote(about_text).as_str(),
            closing.as_str(),
        ]);
        if char_len(&message) <= max {
            return message;
        }

        // cut the about text down to whatever the fixed parts leave over
        if cuttable {
            let fixed = char_len(&assemble(&[
                intro.as_str(),
                theme.as_str(),
                channel_full.as_str(),
                quote("").as_str(),
                closing.as_str(),
            ]));
            if let Some(budget) = max.checked_sub(fixed + ELLIPSIS.len()).filter(|b| *b > 0) {
                let cut: String = about_text.chars().take(budget).collect();
                let short = format!("{}{ELLIPSIS}", cut.trim_end());
                return assemble(&[
                    intro.as_str(),
                    theme.as_str(),
                    channel_full.as_str(),
                    quote(&short).as_str(),
                    closing.as_str(),
                ]);
            }
        }

        // the fixed parts alone are too long: lose the about text, then the live title
        let without_about = assemble(&[
            intro.as_str(),
            theme.as_str(),
            channel_full.as_str(),
            closing.as_str(),
        ]);
        if char_len(&without_about) <= max {
            return without_about;
        }

        let channel_short = self.channel_line(channel, false);
        let head = assemble(&[intro.as_str(), theme.as_str(), channel_short.as_str()]);
        let short = assemble(&[head.as_str(), closing.as_str()]);
        if char_len(&short) <= max {
            return short;
        }

        // keep the link if at all possible
        let closing_len = char_len(&closing);
        if let Some(budget) = max
            .checked_sub(closing_len + 1 + ELLIPSIS.len())
            .filter(|b| *b > 0)
        {
            let cut: String = head.chars().take(budget).collect();
            return format!("{}{ELLIPSIS} {closing}", cut.trim_end());
        }

        short.chars().take(max).collect()
    }

    fn channel_line(&self, channel: &ChannelState, with_title: bool) -> String {
        let game = channel
            .game
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .unwrap_or(&self.config.default_game);

        if !channel.is_live {
            return format!("They usually stream {game}.");
        }

        match channel
            .live_title
            .as_deref()
            .map(str::trim)
            .filter(|t| with_title && !t.is_empty())
        {
            Some(title) => format!("They're live right now with {game}: \"{title}\"."),
            None => format!("They're live right now with {game}."),
        }
    }
}

/// Single-space join that skips empty segments.
fn assemble(segments: &[&str]) -> String {
    segments
        .iter()
        .copied()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
