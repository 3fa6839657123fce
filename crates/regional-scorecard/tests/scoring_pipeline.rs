use regional_scorecard::ingest::DataFolderImporter;
use regional_scorecard::scoring::{
    ActivityKey, BatchInput, CoefficientMap, ExtensionDescriptor, ExtensionRegistry, ScoringConfig,
    ScoringEngine, ScoringError, ValidationError,
};

const POPULATION_CSV: &str = "İL,NÜFUS\n\
İstanbul,15655924\n\
Konya,2320241\n\
Sivas,634924\n\
Kilis,147919\n";

const MEMBERSHIP_CSV: &str = "İL,HEDEFE ULAŞMA ORANI,YÖNETİM KURULU YAPMASI GEREKEN ÜYE SAYISI,YÖNETİM KURULU ÜYELERİ TARAFINDAN REFERANS OLUNAN YENİ ÜYE SAYISI\n\
ISTANBUL,112%,40,36\n\
Konya,95%,20,9\n\
Sivas,\"61\",10,0\n\
Kilis,38%,4,4\n\
TOPLAM,88%,74,49\n";

const COUNCIL_CSV: &str = "İL,İLÇE,HAZİRAN,TEMMUZ,AĞUSTOS\n\
İSTANBUL,İL,YAPILDI,YAPILDI,PLANLANDI\n\
İSTANBUL,KADIKÖY,YAPILDI,,YAPILDI\n\
KONYA,İL,YAPILDI,YAPILDI,YAPILDI\n\
KONYA,SELÇUKLU,yapıldı,YAPILDI,\n\
SİVAS,İL,PLANLANDI,,\n\
KİLİS,İL,YAPILDI,YAPILDI,YAPILDI\n\
KİLİS,ELBEYLİ,YAPILDI,YAPILDI,YAPILDI\n";

const SEASONAL_CSV: &str = "İL,TOPLAM ULAŞILAN KİŞİ,GÖNÜL SOFRASI,SAHUR PROGRAMI,İFTAR PROGRAMI,CAMİ ÇALIŞMALARI\n\
İSTANBUL,\"120,000\",12,4,9,0\n\
KONYA,\"40,500\",3,,1,2\n\
SİVAS,9000,1,0,0,0\n\
KİLİS,2100,,,,\n";

const SYMBOL_CSV: &str = "İL,BAYRAK ADEDİ,YAPILAN ÇALIŞMA\n\
İSTANBUL,8000,TOPLANTI\n\
KONYA,4100,DUYURU\n\
SİVAS,600,\n\
KİLİS,310,TOPLANTI\n";

fn importer() -> DataFolderImporter {
    DataFolderImporter::default()
}

fn batch(tables: &[(&str, &str)]) -> BatchInput {
    importer().from_payloads(tables.iter().copied(), Some(POPULATION_CSV))
}

fn all_builtins() -> BatchInput {
    batch(&[
        ("Üyelik.csv", MEMBERSHIP_CSV),
        ("Danışma_Meclisi.csv", COUNCIL_CSV),
        ("Ramazan_Çalışmaları.csv", SEASONAL_CSV),
        ("Bayrak_Çalışması.csv", SYMBOL_CSV),
    ])
}

#[test]
fn full_batch_ranks_every_region_within_bounds() {
    let report = ScoringEngine::default()
        .run(&all_builtins())
        .expect("run succeeds");

    assert_eq!(report.results.len(), 4);
    for (index, result) in report.results.iter().enumerate() {
        assert_eq!(result.rank, index + 1);
        assert!((0.0..=100.0).contains(&result.final_score));
        assert_eq!(result.activities.len(), 4);
    }
    for pair in report.results.windows(2) {
        assert!(pair[0].final_score >= pair[1].final_score);
    }

    let weight_sum: f64 = report.weights.iter().map(|weight| weight.weight_pct).sum();
    assert!((weight_sum - 100.0).abs() < 1e-6);
    assert!(report.extension_warnings.is_empty());
    assert!(report.availability.iter().all(|note| note.available));
}

#[test]
fn missing_symbol_data_redistributes_its_weight() {
    let input = batch(&[
        ("Üyelik.csv", MEMBERSHIP_CSV),
        ("Danışma_Meclisi.csv", COUNCIL_CSV),
        ("Ramazan_Çalışmaları.csv", SEASONAL_CSV),
    ]);
    let report = ScoringEngine::default().run(&input).expect("run succeeds");

    let effective = |key: ActivityKey| {
        report
            .weights
            .iter()
            .find(|weight| weight.activity == key)
            .map(|weight| weight.effective_coefficient)
            .expect("weight present")
    };
    assert!((effective(ActivityKey::membership()) - 40.0 / 9.0).abs() < 1e-9);
    assert!((effective(ActivityKey::council()) - 30.0 / 9.0).abs() < 1e-9);
    assert!((effective(ActivityKey::seasonal()) - 20.0 / 9.0).abs() < 1e-9);
    assert_eq!(effective(ActivityKey::symbol()), 0.0);

    let total: f64 = report
        .reallocations
        .iter()
        .map(|reallocation| reallocation.effective)
        .sum();
    assert!((total - 10.0).abs() < 1e-9);

    let symbol_note = report
        .availability
        .iter()
        .find(|note| note.activity == ActivityKey::symbol())
        .expect("symbol note");
    assert!(!symbol_note.available);
}

#[test]
fn exact_target_membership_scores_base_and_small_bonus() {
    let input = batch(&[(
        "membership",
        "İL,HEDEFE ULAŞMA ORANI,YÖNETİM KURULU YAPMASI GEREKEN ÜYE SAYISI,YÖNETİM KURULU ÜYELERİ TARAFINDAN REFERANS OLUNAN YENİ ÜYE SAYISI\nKONYA,100%,10,0\n",
    )]);
    let report = ScoringEngine::default().run(&input).expect("run succeeds");
    let konya = report.result("KONYA").expect("konya scored");
    let membership = konya
        .contribution(&ActivityKey::membership())
        .expect("membership contribution");

    assert_eq!(membership.max_score, 100.0);
    let component = |label: &str| {
        membership
            .components
            .iter()
            .find(|component| component.label == label)
            .map(|component| component.value)
            .expect("component present")
    };
    assert!((component("base") - 67.5).abs() < 1e-9);
    assert!((component("bonus") - 5.0).abs() < 1e-9);
    assert_eq!(component("leadership"), 0.0);
    assert!((konya.final_score - 72.5).abs() < 1e-9);
}

#[test]
fn raising_one_regions_input_never_lowers_its_score() {
    let before = ScoringEngine::default()
        .run(&all_builtins())
        .expect("run succeeds");

    let boosted_symbol = SYMBOL_CSV.replace("SİVAS,600,", "SİVAS,6000,");
    let input = batch(&[
        ("Üyelik.csv", MEMBERSHIP_CSV),
        ("Danışma_Meclisi.csv", COUNCIL_CSV),
        ("Ramazan_Çalışmaları.csv", SEASONAL_CSV),
        ("Bayrak_Çalışması.csv", boosted_symbol.as_str()),
    ]);
    let after = ScoringEngine::default().run(&input).expect("run succeeds");

    let sivas_before = before.result("SİVAS").expect("sivas before");
    let sivas_after = after.result("SİVAS").expect("sivas after");
    assert!(sivas_after.final_score >= sivas_before.final_score);
    let symbol = ActivityKey::symbol();
    assert!(
        sivas_after.contribution(&symbol).expect("after").raw
            >= sivas_before.contribution(&symbol).expect("before").raw
    );
}

#[test]
fn identical_inputs_produce_identical_rankings() {
    let engine = ScoringEngine::default();
    let first = engine.run(&all_builtins()).expect("first run");
    let second = engine.run(&all_builtins()).expect("second run");
    assert_eq!(first.results, second.results);
    assert_eq!(first.weights, second.weights);
}

#[test]
fn unknown_files_are_scored_with_the_default_policy() {
    let input = batch(&[
        ("Üyelik.csv", MEMBERSHIP_CSV),
        (
            "Gençlik Etkinlikleri.csv",
            "İL,ETKİNLİK SAYISI\nİSTANBUL,10\nKONYA,30\nSİVAS,20\n",
        ),
    ]);
    let report = ScoringEngine::default().run(&input).expect("run succeeds");
    let youth = ActivityKey::new("genclik_etkinlikleri");

    let weight = report
        .weights
        .iter()
        .find(|weight| weight.activity == youth)
        .expect("generic activity weighted");
    assert_eq!(weight.declared_coefficient, 1.0);
    assert!(weight.available);
    let youth_warnings = report
        .extension_warnings
        .iter()
        .filter(|warning| warning.starts_with("genclik_etkinlikleri"))
        .count();
    assert_eq!(youth_warnings, 1);

    let konya = report.result("KONYA").expect("konya");
    let istanbul = report.result("İSTANBUL").expect("istanbul");
    assert_eq!(konya.contribution(&youth).expect("konya youth").normalized, 1.0);
    assert_eq!(istanbul.contribution(&youth).expect("istanbul youth").normalized, 0.0);
}

#[test]
fn plain_descriptor_reproduces_min_max_scoring() {
    let mut registry = ExtensionRegistry::default();
    let descriptor = ExtensionDescriptor::from_json(
        r#"{"importance_coefficient": 2.0, "key_columns": ["ETKİNLİK SAYISI"], "scoring_methodology": "count events"}"#,
    )
    .expect("descriptor parses");
    let registration = registry.register(ActivityKey::new("youth_events"), &descriptor, 2.0);
    assert!(registration.is_clean());

    let engine = ScoringEngine::new(ScoringConfig::default(), registry);
    let input = batch(&[(
        "youth_events",
        "İL,ETKİNLİK SAYISI\nİSTANBUL,10\nKONYA,20\nSİVAS,30\n",
    )]);
    let report = engine.run(&input).expect("run succeeds");

    let finals: Vec<(&str, f64)> = report
        .results
        .iter()
        .map(|result| (result.region.as_str(), result.final_score))
        .collect();
    assert_eq!(finals.len(), 3);
    assert_eq!(finals[0].0, "SİVAS");
    assert!((finals[0].1 - 100.0).abs() < 1e-9);
    assert_eq!(finals[1].0, "KONYA");
    assert!((finals[1].1 - 50.0).abs() < 1e-9);
    assert_eq!(finals[2].0, "İSTANBUL");
    assert!(finals[2].1.abs() < 1e-9);
}

#[test]
fn invalid_descriptor_fails_closed_with_warnings() {
    let mut registry = ExtensionRegistry::default();
    let descriptor = ExtensionDescriptor {
        importance_coefficient: Some(-1.0),
        key_columns: vec!["  ".to_string()],
        population_normalization: true,
        category_coefficient: true,
    };
    let registration = registry.register(ActivityKey::new("youth_events"), &descriptor, 0.0);
    assert!(registration.fail_closed);
    assert_eq!(registration.coefficient, 1.0);
    assert!(registration.problems.contains(&ValidationError::EmptyKeyColumns));
    assert_eq!(registration.problems.len(), 3);

    let engine = ScoringEngine::new(ScoringConfig::default(), registry);
    let input = batch(&[("youth_events", "İL,ETKİNLİK SAYISI\nKONYA,4\n")]);
    let report = engine.run(&input).expect("run succeeds");
    assert_eq!(report.extension_warnings.len(), 3);
    assert_eq!(report.results[0].final_score, 100.0);
}

#[test]
fn builtin_keys_cannot_be_overridden_by_descriptors() {
    let mut registry = ExtensionRegistry::with_builtins(CoefficientMap::defaults());
    let descriptor = ExtensionDescriptor {
        key_columns: vec!["BAYRAK ADEDİ".to_string()],
        ..ExtensionDescriptor::default()
    };
    let registration = registry.register(ActivityKey::symbol(), &descriptor, 9.0);
    assert!(!registration.installed);
    assert_eq!(registry.declared().get(&ActivityKey::symbol()), Some(1.0));
}

#[test]
fn batch_without_usable_tables_is_rejected() {
    let input = batch(&[("Üyelik.csv", "İL,BAŞKA KOLON\nKONYA,4\n")]);
    let err = ScoringEngine::default().run(&input).expect_err("no data");
    assert_eq!(err, ScoringError::NoActivityData);
}

#[test]
fn new_activity_named_after_a_builtin_word_gets_its_own_scorer() {
    let input = batch(&[
        ("Danışma_Meclisi.csv", COUNCIL_CSV),
        (
            "youth_council_meetings.csv",
            "İL,TOPLANTI SAYISI\nİSTANBUL,2\nKONYA,6\nSİVAS,4\n",
        ),
    ]);
    assert_eq!(input.tables.len(), 2);
    let report = ScoringEngine::default().run(&input).expect("run succeeds");

    let meetings = ActivityKey::new("youth_council_meetings");
    let note = report
        .availability
        .iter()
        .find(|note| note.activity == meetings)
        .expect("meetings note");
    assert!(note.available);
    let konya = report.result("KONYA").expect("konya");
    assert_eq!(konya.contribution(&meetings).expect("scored").normalized, 1.0);
}
