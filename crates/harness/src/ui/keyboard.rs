//! Keyboard-driven UI: act blind through simulated input
//!
//! Without the inspector there is nothing to read back, so navigation
//! works from fixed maps: the category strip is walked with
//! ctrl+Next/ctrl+Prior from a tracked position, environments map to
//! the top key row by their alphabetical position in the category, and
//! time choices sit on keys 1-4. Waits degrade to bounded sleeps.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::{TimeOfDay, UiDriver};
use crate::error::{HarnessError, Result};
use crate::window::Window;

/// Category strip order as the application lays it out.
const CATEGORY_ORDER: [&str; 11] = [
    "tavern",
    "town",
    "interiors",
    "travel",
    "forest",
    "coastal",
    "dungeon",
    "combat",
    "spooky",
    "relaxation",
    "celestial",
];

/// Key row bound to the first ten environments of the open category.
const ENV_KEYS: [char; 10] = ['q', 'w', 'e', 'r', 't', 'y', 'u', 'i', 'o', 'p'];

/// Travel environments in the application's alphabetical order.
const TRAVEL_ENVIRONMENTS: [&str; 8] = [
    "Blizzard",
    "Boat",
    "Desert",
    "River",
    "Snow",
    "Travel",
    "Travel Rainy",
    "Travel Storm",
];

/// Longest blind wait; past this a sleep stops buying anything.
const MAX_BLIND_WAIT: Duration = Duration::from_secs(5);
/// Pause after each simulated key press.
const KEY_PAUSE: Duration = Duration::from_millis(300);

fn category_position(category: &str) -> Option<usize> {
    let wanted = category.to_ascii_lowercase();
    CATEGORY_ORDER.iter().position(|name| *name == wanted)
}

fn environment_key(environment: &str) -> Option<char> {
    let position = TRAVEL_ENVIRONMENTS
        .iter()
        .position(|name| *name == environment)?;
    ENV_KEYS.get(position).copied()
}

fn time_key(time: TimeOfDay) -> &'static str {
    match time {
        TimeOfDay::Morning => "1",
        TimeOfDay::Daytime => "2",
        TimeOfDay::Afternoon => "3",
        TimeOfDay::Evening => "4",
    }
}

pub struct KeyboardDriver {
    window: Window,
    /// Category the strip currently sits on; the app starts on the first.
    position: usize,
}

impl KeyboardDriver {
    pub fn new(window: Window) -> Self {
        Self {
            window,
            position: 0,
        }
    }

    async fn blind_wait(&self, timeout: Duration, doing: &str) {
        let wait = timeout.min(MAX_BLIND_WAIT);
        tracing::debug!(?wait, doing, "cannot observe the page, sleeping instead");
        tokio::time::sleep(wait).await;
    }
}

#[async_trait]
impl UiDriver for KeyboardDriver {
    fn name(&self) -> &'static str {
        "keyboard"
    }

    fn can_invoke(&self) -> bool {
        false
    }

    fn can_observe(&self) -> bool {
        false
    }

    async fn open_category(&mut self, category: &str) -> Result<()> {
        let target = category_position(category).ok_or_else(|| HarnessError::UnknownCategory {
            category: category.to_string(),
        })?;
        let (chord, steps) = if target >= self.position {
            ("ctrl+Next", target - self.position)
        } else {
            ("ctrl+Prior", self.position - target)
        };
        tracing::debug!(category, steps, chord, "walking the category strip");
        for _ in 0..steps {
            self.window.key(chord).await?;
            tokio::time::sleep(KEY_PAUSE).await;
        }
        self.position = target;
        Ok(())
    }

    async fn start_environment(&mut self, environment: &str) -> Result<()> {
        let key = match environment_key(environment) {
            Some(key) => key,
            None => {
                tracing::warn!(environment, "no key mapping, picking the first slot");
                ENV_KEYS[0]
            }
        };
        self.window.key(&key.to_string()).await?;
        tokio::time::sleep(KEY_PAUSE).await;
        Ok(())
    }

    async fn select_time(&mut self, time: TimeOfDay) -> Result<()> {
        self.window.key(time_key(time)).await?;
        tokio::time::sleep(KEY_PAUSE).await;
        Ok(())
    }

    async fn element_text(&mut self, _selector: &str) -> Result<String> {
        Err(HarnessError::InspectorRequired {
            operation: "element text",
        })
    }

    async fn wait_for_element(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        self.blind_wait(timeout, selector).await;
        Ok(())
    }

    async fn wait_for_absence(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        self.blind_wait(timeout, selector).await;
        Ok(())
    }

    async fn wait_for_text(
        &mut self,
        selector: &str,
        _needle: &str,
        timeout: Duration,
    ) -> Result<bool> {
        self.blind_wait(timeout, selector).await;
        Ok(false)
    }

    async fn invoke(&mut self, _command: &str, _args: Value, _timeout: Duration) -> Result<Value> {
        Err(HarnessError::InspectorRequired {
            operation: "bridged command",
        })
    }

    async fn dump_state(&mut self) -> Result<Value> {
        tracing::info!("keyboard path cannot observe page state");
        Ok(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_resolve_to_strip_positions() {
        assert_eq!(category_position("tavern"), Some(0));
        assert_eq!(category_position("Travel"), Some(3));
        assert_eq!(category_position("celestial"), Some(10));
        assert_eq!(category_position("karaoke"), None);
    }

    #[test]
    fn environments_map_to_their_alphabetical_key() {
        assert_eq!(environment_key("Blizzard"), Some('q'));
        assert_eq!(environment_key("Travel"), Some('y'));
        assert_eq!(environment_key("Travel Storm"), Some('i'));
        assert_eq!(environment_key("Karaoke Night"), None);
    }

    #[test]
    fn time_slots_sit_on_the_number_row() {
        assert_eq!(time_key(TimeOfDay::Morning), "1");
        assert_eq!(time_key(TimeOfDay::Daytime), "2");
        assert_eq!(time_key(TimeOfDay::Afternoon), "3");
        assert_eq!(time_key(TimeOfDay::Evening), "4");
    }
}
