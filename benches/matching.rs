use chrono::{TimeZone, Utc};
use chrono_tz::UTC;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use campaign_engine::{
    predicate::{Comparison, ComparisonOperator, Modifier, Predicate},
    Campaign, CampaignSet, DeviceSnapshot, Event, EventAttributesFilter, EventTrigger,
    InMemoryCampaignRepository, MatcherConfig,
};

fn criterion_benchmark(c: &mut Criterion) {
    let json = std::fs::read_to_string("tests/data/campaigns.json").unwrap();
    let fixture = CampaignSet::from_json(&json).unwrap().into_campaigns();

    // Pad the fixture with many campaigns on the same event so the pipeline has work to do.
    let padding = (0..1000).map(|i| {
        let predicate = Predicate::compare("amount", ComparisonOperator::GreaterThan, f64::from(i))
            .unwrap();
        Campaign::new(
            format!("padding-{i}"),
            EventTrigger::new("Purchase", None).with_filter(EventAttributesFilter { predicate }),
        )
    });
    let repository = InMemoryCampaignRepository::with_campaigns(fixture.into_iter().chain(padding));
    let matcher = MatcherConfig::new().time_zone(UTC).to_matcher(repository);
    let today = Utc.with_ymd_and_hms(2024, 6, 4, 12, 0, 0).unwrap();

    {
        let mut group = c.benchmark_group("purchase");
        group.throughput(Throughput::Elements(1));
        let event = Event::new("Purchase").with_attribute("amount", 420.0);
        let device = DeviceSnapshot::new();
        group.bench_function("match_event_at", |b| {
            b.iter(|| {
                matcher.match_event_at(
                    black_box(&event),
                    black_box(&device),
                    black_box(today),
                    UTC,
                )
            })
        });
        group.bench_function("match_event_details", |b| {
            b.iter(|| {
                matcher.match_event_details(
                    black_box(&event),
                    black_box(&device),
                    black_box(today),
                    UTC,
                )
            })
        });
        group.finish();
    }

    {
        let mut group = c.benchmark_group("geo-within");
        group.throughput(Throughput::Elements(1));
        let event = Event::new("AppOpen");
        let device = DeviceSnapshot::new().with_attribute("location", vec![45.4215, -75.6972]);
        group.bench_function("match_event_at", |b| {
            b.iter(|| {
                matcher.match_event_at(
                    black_box(&event),
                    black_box(&device),
                    black_box(today),
                    UTC,
                )
            })
        });
        group.finish();
    }

    {
        let mut group = c.benchmark_group("predicate");
        group.throughput(Throughput::Elements(1));
        let predicate = Predicate::or(vec![
            Predicate::compare("locale", ComparisonOperator::Like, "en_*").unwrap(),
            Comparison::new(
                "tags",
                Modifier::Any,
                ComparisonOperator::In,
                vec!["vip", "beta"],
            )
            .unwrap()
            .into(),
        ]);
        let device = DeviceSnapshot::new()
            .with_attribute("locale", "fr_CA")
            .with_attribute("tags", vec!["alpha", "beta"]);
        group.bench_function("evaluate", |b| {
            b.iter(|| black_box(&predicate).evaluate(black_box(device.attributes())))
        });
        group.finish();
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
