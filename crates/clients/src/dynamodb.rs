use std::env;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::Client as DdbClient;
use pocguide_common::{define_module_client, ModuleClient};

define_module_client! {
    (struct DynamoClient, "dynamodb")
    client_type: DdbClient,
    env: ["AWS_REGION", "AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY"],
    setup: async {
        let region = env::var("AWS_REGION").expect("AWS_REGION is not set");

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region))
            .load()
            .await;

        DdbClient::new(&config)
    }
}

impl DynamoClient {
    pub fn builds_table(&self) -> String {
        env::var("BUILDS_TABLE").unwrap_or_else(|_| "Builds".to_string())
    }

    pub fn comments_table(&self) -> String {
        env::var("COMMENTS_TABLE").unwrap_or_else(|_| "Comments".to_string())
    }

    pub fn champions_table(&self) -> String {
        env::var("CHAMPIONS_TABLE").unwrap_or_else(|_| "guidePocChampionList".to_string())
    }

    pub fn items_table(&self) -> String {
        env::var("ITEMS_TABLE").unwrap_or_else(|_| "guidePocItems".to_string())
    }

    pub fn powers_table(&self) -> String {
        env::var("POWERS_TABLE").unwrap_or_else(|_| "guidePocPowers".to_string())
    }

    pub fn relics_table(&self) -> String {
        env::var("RELICS_TABLE").unwrap_or_else(|_| "guidePocRelics".to_string())
    }

    pub fn runes_table(&self) -> String {
        env::var("RUNES_TABLE").unwrap_or_else(|_| "guidePocRunes".to_string())
    }

    pub fn general_powers_table(&self) -> String {
        env::var("GENERAL_POWERS_TABLE").unwrap_or_else(|_| "guidePocGeneralPowers".to_string())
    }

    pub fn champion_videos_table(&self) -> String {
        env::var("CHAMPION_VIDEOS_TABLE").unwrap_or_else(|_| "guidePocVideoAndMusic".to_string())
    }
}
