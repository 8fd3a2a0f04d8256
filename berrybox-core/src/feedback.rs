use crate::{UserData, VideoData};

/// Tells clients how to present a feedback message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackContext {
    Info,
    /// The action was paid for with berries
    Berries,
}

/// A system message describing what a queue action did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackMessage {
    pub context: FeedbackContext,
    pub contents: String,
}

impl FeedbackMessage {
    pub fn new(context: FeedbackContext, contents: impl Into<String>) -> Self {
        Self {
            context,
            contents: contents.into(),
        }
    }

    pub fn info(contents: impl Into<String>) -> Self {
        Self::new(FeedbackContext::Info, contents)
    }

    pub fn with_berries(self, paid: bool) -> Self {
        if paid {
            Self {
                context: FeedbackContext::Berries,
                ..self
            }
        } else {
            self
        }
    }
}

fn paid_suffix(paid: bool) -> &'static str {
    if paid {
        " with berries"
    } else {
        ""
    }
}

pub fn video_submitted(submitter: Option<&UserData>, video: &VideoData) -> FeedbackMessage {
    match submitter {
        Some(user) => FeedbackMessage::info(format!(
            "{} has added the video \"{}\" to the queue.",
            user.name, video.name
        )),
        None => FeedbackMessage::info(format!(
            "The video \"{}\" has been added to the queue.",
            video.name
        )),
    }
}

pub fn video_already_queued(video: &VideoData) -> FeedbackMessage {
    FeedbackMessage::info(format!(
        "The video \"{}\" is already in the queue.",
        video.name
    ))
}

pub fn video_removed(actor: Option<&UserData>, video: &VideoData) -> FeedbackMessage {
    match actor {
        Some(user) => FeedbackMessage::info(format!(
            "{} has removed the video \"{}\" from the queue.",
            user.name, video.name
        )),
        None => FeedbackMessage::info(format!(
            "The video \"{}\" has been removed from the queue.",
            video.name
        )),
    }
}

pub fn preselected(
    actor: Option<&UserData>,
    video: &VideoData,
    replaced: Option<&VideoData>,
    paid: bool,
) -> FeedbackMessage {
    let name = actor.map(|u| u.name.as_str()).unwrap_or("The system");

    let mut contents = format!(
        "{} has preselected the video \"{}\"{}. It will play next.",
        name,
        video.name,
        paid_suffix(paid)
    );

    if let Some(replaced) = replaced {
        contents.push_str(&format!(
            " The video \"{}\" is no longer preselected.",
            replaced.name
        ));
    }

    FeedbackMessage::info(contents).with_berries(paid)
}

pub fn preselection_removed(actor: Option<&UserData>, video: &VideoData) -> FeedbackMessage {
    let name = actor.map(|u| u.name.as_str()).unwrap_or("The system");

    FeedbackMessage::info(format!(
        "{} has removed the preselection of \"{}\".",
        name, video.name
    ))
}

pub fn force_played(actor: Option<&UserData>, video: &VideoData, paid: bool) -> FeedbackMessage {
    let name = actor.map(|u| u.name.as_str()).unwrap_or("The system");

    FeedbackMessage::info(format!(
        "{} has forced the video \"{}\" to play{}.",
        name,
        video.name,
        paid_suffix(paid)
    ))
    .with_berries(paid)
}

pub fn skipped(actor: Option<&UserData>, next: Option<&VideoData>, paid: bool) -> FeedbackMessage {
    let name = actor.map(|u| u.name.as_str()).unwrap_or("The system");

    let mut contents = format!(
        "{} has skipped the previous video{}.",
        name,
        paid_suffix(paid)
    );

    if let Some(next) = next {
        contents.push_str(&format!(" Currently playing: \"{}\".", next.name));
    }

    FeedbackMessage::info(contents).with_berries(paid)
}

pub fn now_playing(video: &VideoData) -> FeedbackMessage {
    FeedbackMessage::info(format!("Currently playing: \"{}\".", video.name))
}

pub fn queue_ended() -> FeedbackMessage {
    FeedbackMessage::info("The queue has ended. Submit a video to keep watching.")
}

#[cfg(test)]
mod test {
    use super::*;

    fn video() -> VideoData {
        VideoData {
            id: 1,
            link: "dQw4w9WgXcQ".to_string(),
            name: "Never Gonna Give You Up".to_string(),
            duration: "PT3M33S".to_string(),
        }
    }

    #[test]
    fn test_paid_actions_use_berries_context() {
        let user = UserData {
            id: 2,
            name: "Ash".to_string(),
        };

        let free = skipped(Some(&user), None, false);
        assert_eq!(free.context, FeedbackContext::Info);
        assert!(!free.contents.contains("berries"));

        let paid = force_played(Some(&user), &video(), true);
        assert_eq!(paid.context, FeedbackContext::Berries);
        assert!(paid.contents.starts_with("Ash"));
    }

    #[test]
    fn test_system_submission_is_generic() {
        let message = video_submitted(None, &video());
        assert_eq!(
            message.contents,
            "The video \"Never Gonna Give You Up\" has been added to the queue."
        );
    }
}
