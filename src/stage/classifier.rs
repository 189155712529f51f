//! Raw stage label classification.

use super::Stage;

/// Known spellings for each canonical stage, in table order.
///
/// Entries are lowercase. Matching is exact after normalisation, so the order
/// of synonyms inside an entry does not matter; the order of entries does,
/// since the first entry is also the fallback.
pub const STAGE_SYNONYMS: &[(Stage, &[&str])] = &[
    (
        Stage::Lead,
        &[
            "lead",
            "leads",
            "new",
            "new_lead",
            "new lead",
            "prospect",
            "qualified",
            "contacted",
            "initial_contact",
            "yeni",
            "aday",
            "potansiyel",
            "potansiyel müşteri",
            "ilk görüşme",
            "iletişime geçildi",
        ],
    ),
    (
        Stage::Proposal,
        &[
            "proposal",
            "proposal_sent",
            "proposal sent",
            "quote",
            "quoted",
            "offer",
            "teklif",
            "teklif gönderildi",
            "teklif hazırlanıyor",
        ],
    ),
    (
        Stage::Negotiation,
        &[
            "negotiation",
            "negotiating",
            "negotiate",
            "in_negotiation",
            "contract",
            "contract_sent",
            "müzakere",
            "pazarlık",
            "sözleşme",
            "görüşme",
        ],
    ),
    (
        Stage::Won,
        &[
            "won",
            "closed_won",
            "closed won",
            "win",
            "kazanıldı",
            "kazanılan",
            "tamamlandı",
        ],
    ),
    (
        Stage::Lost,
        &[
            "lost",
            "closed_lost",
            "closed lost",
            "rejected",
            "cancelled",
            "canceled",
            "kaybedildi",
            "kaybedilen",
            "iptal",
            "reddedildi",
        ],
    ),
];

/// Maps an arbitrary label onto exactly one canonical stage.
///
/// Null, empty and unknown labels fall back to the first table entry
/// ([`Stage::Lead`]); this never fails.
pub fn classify_stage(raw: Option<&str>) -> Stage {
    let fallback = STAGE_SYNONYMS[0].0;
    let Some(raw) = raw else {
        return fallback;
    };

    let label = normalize(raw);
    if label.is_empty() {
        return fallback;
    }

    STAGE_SYNONYMS
        .iter()
        .find(|(_, synonyms)| synonyms.iter().any(|synonym| folds_to(synonym, &label)))
        .map(|(stage, _)| *stage)
        .unwrap_or(fallback)
}

// Turkish dotted and dotless i both fold to ASCII `i`: `İ` lowercases to
// `i` + combining dot, and `ı` uppercases to `I`, which lowercases to `i`.
fn normalize(raw: &str) -> String {
    fold_dotless_i(&raw.trim().replace('İ', "i").to_lowercase())
}

fn fold_dotless_i(label: &str) -> String {
    label.replace('ı', "i")
}

/// Compares a table entry with a normalized label without allocating.
fn folds_to(synonym: &str, label: &str) -> bool {
    synonym
        .chars()
        .map(|c| if c == 'ı' { 'i' } else { c })
        .eq(label.chars())
}
