use campaign_engine::{
    CampaignSet, DeviceSnapshot, Event, InMemoryCampaignRepository, MatcherConfig,
};

const CAMPAIGNS: &str = r#"{
    "campaigns": [
        {
            "id": "big-purchase",
            "trigger": {
                "eventName": "Purchase",
                "filters": [{
                    "type": "eventAttributes",
                    "predicate": {
                        "predicateType": "comparison",
                        "predicate": { "keyPath": "amount", "operator": "greaterThan", "numberValue": 10 }
                    }
                }]
            },
            "frequencyLimits": [{ "count": 1, "intervalSeconds": 86400 }]
        }
    ]
}"#;

pub fn main() -> campaign_engine::Result<()> {
    env_logger::init();

    // In an app, the sync layer replaces campaigns whenever it fetches a new set.
    let repository = InMemoryCampaignRepository::new();
    repository.set_campaigns(CampaignSet::from_json(CAMPAIGNS)?.into_campaigns());

    // Days and times of day are evaluated in the device zone.
    let matcher = MatcherConfig::new().to_matcher(repository);

    let event = Event::new("Purchase").with_attribute("amount", 42.0);
    let device = DeviceSnapshot::new().with_attribute("locale", "en_CA");

    for campaign in matcher.match_event(&event, &device)? {
        let limits = campaign
            .frequency_limits()
            .iter()
            .map(|limit| format!("{} per {}", limit.count, limit.interval()))
            .collect::<Vec<_>>();
        println!("Matched {} (limits: {:?})", campaign.id(), limits);
    }

    Ok(())
}
