use std::sync::Arc;

use anyhow::Result;
use pocguide_clients::{CognitoClient, DynamoClient, TokenVerifier};
use pocguide_common::{EnvVars, ModuleClient};
use pocguide_store::{BuildStore, ChampionStore, CommentStore, ReferenceStore};

use crate::env::ApiServerEnv;

/// Everything a request handler can reach. The app tier is stateless: no
/// caches, no locks — the store is the only shared mutable resource.
#[derive(Clone)]
pub struct GlobalState {
    pub builds: BuildStore,
    pub comments: CommentStore,
    pub champions: ChampionStore,
    pub items: ReferenceStore,
    pub powers: ReferenceStore,
    pub relics: ReferenceStore,
    pub runes: ReferenceStore,
    pub general_powers: ReferenceStore,
    pub champion_videos: ReferenceStore,
    pub cognito: CognitoClient,
    pub verifier: Arc<TokenVerifier>,
}

impl GlobalState {
    pub async fn new() -> Result<Self> {
        let env = ApiServerEnv::load();

        let db = DynamoClient::setup_connection().await;
        let cognito = CognitoClient::setup_connection().await;
        let verifier = Arc::new(
            TokenVerifier::from_user_pool(
                &env.aws_region,
                &env.cognito_user_pool_id,
                &env.cognito_app_client_id,
            )
            .await?,
        );

        Ok(Self {
            builds: BuildStore::new(db.clone()),
            comments: CommentStore::new(db.clone()),
            champions: ChampionStore::new(db.clone()),
            items: ReferenceStore::new(db.clone(), db.items_table(), "itemCode"),
            powers: ReferenceStore::new(db.clone(), db.powers_table(), "powerCode"),
            relics: ReferenceStore::new(db.clone(), db.relics_table(), "relicCode"),
            runes: ReferenceStore::new(db.clone(), db.runes_table(), "runeCode"),
            general_powers: ReferenceStore::new(
                db.clone(),
                db.general_powers_table(),
                "generalPowerCode",
            ),
            champion_videos: ReferenceStore::new(db.clone(), db.champion_videos_table(), "name"),
            cognito,
            verifier,
        })
    }
}
