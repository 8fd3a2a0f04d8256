use std::time::Duration;

use async_trait::async_trait;
use berrybox_core::{BoxData, BoxOptions, Config, UserData};
use tokio::time::timeout;

use crate::{
    Collab, Database, JobReceiver, MemoryDatabase, NewBox, NewUser, ResolveError, ResolvedVideo,
    TransitionJob, UpdatedBox, VideoResolver,
};

/// Resolves any link to itself. A few links behave differently:
/// `missing` and `private` fail, `long` lasts two hours, `bad:` links are not recognized.
pub struct FakeResolver;

#[async_trait]
impl VideoResolver for FakeResolver {
    fn identify(&self, link: &str) -> Result<String, ResolveError> {
        if link.starts_with("bad:") {
            return Err(ResolveError::NoMatch);
        }

        Ok(link.to_string())
    }

    async fn resolve(&self, id: &str) -> Result<ResolvedVideo, ResolveError> {
        let duration = match id {
            "missing" => return Err(ResolveError::NotFound),
            "private" => return Err(ResolveError::NotEmbeddable),
            "long" => "PT2H",
            _ => "PT1M",
        };

        Ok(ResolvedVideo {
            link: id.to_string(),
            name: format!("Video {}", id),
            duration: duration.to_string(),
        })
    }
}

pub type TestCollab = Collab<MemoryDatabase, FakeResolver>;

pub struct Setup {
    pub collab: TestCollab,
    pub jobs: JobReceiver,
    pub creator: UserData,
    pub guest: UserData,
    pub box_data: BoxData,
}

pub async fn setup() -> Setup {
    setup_with(BoxOptions::default()).await
}

/// Creates a box owned by `creator`, with `guest` as a second user.
/// Timer jobs are not handled, tests pass them on with [next_job].
pub async fn setup_with(options: BoxOptions) -> Setup {
    let (collab, jobs) =
        Collab::without_handler(Config::default(), MemoryDatabase::new(), FakeResolver);
    let database = &collab.context().database;

    let creator = database
        .create_user(NewUser {
            name: "Ash".to_string(),
        })
        .await
        .unwrap();
    let guest = database
        .create_user(NewUser {
            name: "Misty".to_string(),
        })
        .await
        .unwrap();

    let box_data = collab
        .boxes
        .create_box(NewBox {
            name: "Pallet Town".to_string(),
            private: false,
            options,
            user_id: creator.id,
        })
        .await
        .unwrap();

    Setup {
        collab,
        jobs,
        creator,
        guest,
        box_data,
    }
}

/// Enables berries in the box of the setup
pub async fn with_berries(setup: &Setup) -> BoxData {
    let options = BoxOptions {
        berries: true,
        ..setup.box_data.options.clone()
    };

    setup
        .collab
        .boxes
        .update_box(
            setup.creator.id,
            UpdatedBox {
                id: setup.box_data.id,
                options: Some(options),
                ..Default::default()
            },
        )
        .await
        .unwrap()
}

/// Waits for the next fired timer
pub async fn next_job(jobs: &mut JobReceiver) -> TransitionJob {
    timeout(Duration::from_secs(1), jobs.recv())
        .await
        .expect("a timer fires")
        .expect("the scheduler is alive")
}
