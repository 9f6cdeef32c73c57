//! Keyword-based district detection for free-text delivery addresses.
//!
//! Addresses are checked against each district's keyword set in a fixed order. Rural districts come first; the broad
//! central-city pattern is checked last, so "Hang Dong, Mueang Chiang Mai" resolves to Hang Dong.
//!
//! Latin keywords must match whole words: "haiya" matches "Haiya Road" but not "Chaiyaphum". Thai is written
//! without spaces between words, so Thai keywords are matched anywhere in the normalised text.
use crate::db_types::District;

/// Districts in the order they are tested.
const PRECEDENCE: [(District, &[&str]); 8] = [
    (District::SanPaTong, &["san pa tong", "sanpatong", "สันป่าตอง"]),
    (District::HangDong, &["hang dong", "hangdong", "หางดง"]),
    (District::MaeRim, &["mae rim", "maerim", "แม่ริม"]),
    (District::DoiSaket, &["doi saket", "doisaket", "ดอยสะเก็ด"]),
    (District::SanKamphaeng, &["san kamphaeng", "san kampaeng", "sankamphaeng", "สันกำแพง"]),
    (District::SanSai, &["san sai", "sansai", "สันทราย"]),
    (District::Saraphi, &["saraphi", "sarapee", "สารภี"]),
    (District::Mueang, &[
        "mueang",
        "muang",
        "old city",
        "nimman",
        "nimmanhaemin",
        "chang phueak",
        "chang khlan",
        "si phum",
        "sriphum",
        "wat ket",
        "haiya",
        "suthep",
        "เมือง",
        "ศรีภูมิ",
        "ช้างเผือก",
        "สุเทพ",
    ]),
];

/// Collapses an address into a comparable form: lower case, keeping only alphanumeric characters. Thai tone marks
/// are dropped too, which is harmless because keywords go through the same function.
pub fn normalise(text: &str) -> String {
    text.to_lowercase().chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Splits Latin text into lower-case words. Anything that is not alphanumeric separates words.
fn words(text: &str) -> Vec<String> {
    text.to_lowercase().split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()).map(String::from).collect()
}

fn keyword_matches(keyword: &str, address_words: &[String], collapsed: &str) -> bool {
    if keyword.is_ascii() {
        let phrase = words(keyword);
        !phrase.is_empty() && address_words.windows(phrase.len()).any(|window| window == phrase.as_slice())
    } else {
        collapsed.contains(&normalise(keyword))
    }
}

/// Infers the district from an address. Returns [`District::Unknown`] when nothing matches.
pub fn detect_district(address: &str) -> District {
    let collapsed = normalise(address);
    if collapsed.is_empty() {
        return District::Unknown;
    }
    let address_words = words(address);
    PRECEDENCE
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| keyword_matches(k, &address_words, &collapsed)))
        .map(|(district, _)| *district)
        .unwrap_or(District::Unknown)
}
