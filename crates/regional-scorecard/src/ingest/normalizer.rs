use crate::scoring::AGGREGATE_ROW;
use crate::text::{ascii_fold, clean, turkish_uppercase};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

const PROVINCES: [&str; 81] = [
    "ADANA", "ADIYAMAN", "AFYONKARAHİSAR", "AĞRI", "AKSARAY", "AMASYA", "ANKARA", "ANTALYA",
    "ARDAHAN", "ARTVİN", "AYDIN", "BALIKESİR", "BARTIN", "BATMAN", "BAYBURT", "BİLECİK",
    "BİNGÖL", "BİTLİS", "BOLU", "BURDUR", "BURSA", "ÇANAKKALE", "ÇANKIRI", "ÇORUM", "DENİZLİ",
    "DİYARBAKIR", "DÜZCE", "EDİRNE", "ELAZIĞ", "ERZİNCAN", "ERZURUM", "ESKİŞEHİR",
    "GAZİANTEP", "GİRESUN", "GÜMÜŞHANE", "HAKKARİ", "HATAY", "IĞDIR", "ISPARTA", "İSTANBUL",
    "İZMİR", "KAHRAMANMARAŞ", "KARABÜK", "KARAMAN", "KARS", "KASTAMONU", "KAYSERİ",
    "KIRIKKALE", "KIRKLARELİ", "KIRŞEHİR", "KOCAELİ", "KONYA", "KÜTAHYA", "MALATYA",
    "MANİSA", "MARDİN", "MERSİN", "MUĞLA", "MUŞ", "NEVŞEHİR", "NİĞDE", "ORDU", "OSMANİYE",
    "RİZE", "SAKARYA", "SAMSUN", "SİİRT", "SİNOP", "SİVAS", "ŞANLIURFA", "ŞIRNAK", "TEKİRDAĞ",
    "TOKAT", "TRABZON", "TUNCELİ", "UŞAK", "VAN", "YALOVA", "YOZGAT", "ZONGULDAK", "KİLİS",
];

const ALIASES: &[(&str, &str)] = &[
    ("AFYON", "AFYONKARAHİSAR"),
    ("K.MARAŞ", "KAHRAMANMARAŞ"),
    ("K. MARAŞ", "KAHRAMANMARAŞ"),
    ("MARAŞ", "KAHRAMANMARAŞ"),
    ("İÇEL", "MERSİN"),
    (AGGREGATE_ROW, AGGREGATE_ROW),
];

static PROVINCE_INDEX: OnceLock<HashMap<String, &'static str>> = OnceLock::new();

/// Canonical uppercase Turkish spelling of a province name. Names that match
/// no province come back cleaned and uppercased.
pub fn normalize_province(raw: &str) -> String {
    let cleaned = clean(raw);
    let upper = turkish_uppercase(&cleaned);
    match province_index().get(&lookup_key(&upper)) {
        Some(canonical) => (*canonical).to_string(),
        None => {
            if !upper.is_empty() {
                debug!(name = %cleaned, "unrecognized province name");
            }
            upper
        }
    }
}

/// True for names that are one of the 81 provinces or a known alias.
pub fn is_known_province(raw: &str) -> bool {
    let upper = turkish_uppercase(&clean(raw));
    province_index().contains_key(&lookup_key(&upper))
}

fn lookup_key(upper: &str) -> String {
    ascii_fold(upper)
}

fn province_index() -> &'static HashMap<String, &'static str> {
    PROVINCE_INDEX.get_or_init(|| {
        let mut index: HashMap<String, &'static str> = PROVINCES
            .iter()
            .map(|province| (lookup_key(province), *province))
            .collect();
        for (alias, canonical) in ALIASES {
            index.insert(lookup_key(alias), *canonical);
        }
        index
    })
}
