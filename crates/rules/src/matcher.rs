//! Schema matching.
//!
//! Each extracted field is tried against the configured elements that are still unclaimed,
//! tier by tier, and the first hit wins:
//!
//! 1. exact normalized name
//! 2. mapping table of known label spellings
//! 3. element aliases
//! 4. fuzzy substring containment
//!
//! A claimed element leaves the pool. Fields are visited in input order and elements in
//! configuration order, so identical input always produces identical output.

use docveil_types::{mask_snippet, ConfiguredDataElement, ExtractedField, MatchResult, MatchTier};

/// Raw label spellings (normalized, so field codes keep their underscores) and the canonical
/// element names they stand for. Candidates are tried in the listed order.
static LABEL_MAPPINGS: &[(&str, &[&str])] = &[
    ("PASSPORTNO", &["Passport Number"]),
    ("PASSPORT_NO", &["Passport Number"]),
    ("PASSPORT_NUMBER", &["Passport Number"]),
    ("PASSPORTNUM", &["Passport Number"]),
    ("PASSPORT_NUM", &["Passport Number"]),
    ("PASSPORT", &["Passport Number"]),
    ("DOCUMENTNO", &["Document Number", "Passport Number"]),
    ("DOCUMENT_NO", &["Document Number", "Passport Number"]),
    ("DOCUMENT_NUMBER", &["Document Number", "Passport Number"]),
    ("DOCNO", &["Document Number"]),
    ("DOC_NO", &["Document Number"]),
    ("DOB", &["Date of Birth"]),
    ("BIRTHDATE", &["Date of Birth"]),
    ("BIRTH_DATE", &["Date of Birth"]),
    ("DATEOFBIRTH", &["Date of Birth"]),
    ("DATE_OF_BIRTH", &["Date of Birth"]),
    ("EXPIRY", &["Date of Expiry", "Expiry Date"]),
    ("EXPIRYDATE", &["Date of Expiry", "Expiry Date"]),
    ("EXPIRY_DATE", &["Date of Expiry", "Expiry Date"]),
    ("DATE_OF_EXPIRY", &["Date of Expiry", "Expiry Date"]),
    ("DATEOFEXPIRATION", &["Date of Expiry", "Expiry Date"]),
    ("DATE_OF_EXPIRATION", &["Date of Expiry", "Expiry Date"]),
    ("VALIDUNTIL", &["Date of Expiry", "Expiry Date"]),
    ("VALID_UNTIL", &["Date of Expiry", "Expiry Date"]),
    ("ISSUEDATE", &["Date of Issue"]),
    ("ISSUE_DATE", &["Date of Issue"]),
    ("DATEOFISSUE", &["Date of Issue"]),
    ("DATE_OF_ISSUE", &["Date of Issue"]),
    ("SURNAME", &["Last Name", "Surname"]),
    ("FAMILYNAME", &["Last Name", "Surname"]),
    ("FAMILY_NAME", &["Last Name", "Surname"]),
    ("LASTNAME", &["Last Name", "Surname"]),
    ("LAST_NAME", &["Last Name", "Surname"]),
    ("GIVENNAMES", &["First Name", "Given Names"]),
    ("GIVEN_NAMES", &["First Name", "Given Names"]),
    ("GIVENNAME", &["First Name", "Given Names"]),
    ("GIVEN_NAME", &["First Name", "Given Names"]),
    ("FORENAME", &["First Name"]),
    ("FIRSTNAME", &["First Name"]),
    ("FIRST_NAME", &["First Name"]),
    ("FULLNAME", &["Full Name", "Name"]),
    ("FULL_NAME", &["Full Name", "Name"]),
    ("NAME", &["Full Name", "Name"]),
    ("SEX", &["Gender", "Sex"]),
    ("GENDER", &["Gender", "Sex"]),
    ("NATIONALITY", &["Nationality", "Citizenship"]),
    ("CITIZENSHIP", &["Nationality", "Citizenship"]),
    ("PLACEOFBIRTH", &["Place of Birth"]),
    ("PLACE_OF_BIRTH", &["Place of Birth"]),
    ("EMAILADDRESS", &["Email"]),
    ("EMAIL_ADDRESS", &["Email"]),
    ("EMAIL", &["Email"]),
    ("E_MAIL", &["Email"]),
    ("MAIL", &["Email"]),
    ("TEL", &["Phone Number"]),
    ("TELEPHONE", &["Phone Number"]),
    ("PHONE", &["Phone Number"]),
    ("PHONE_NUMBER", &["Phone Number"]),
    ("PHONE_NO", &["Phone Number"]),
    ("MOBILE", &["Phone Number"]),
    ("ADDRESS", &["Postal Address", "Address"]),
    ("HOMEADDRESS", &["Postal Address", "Address"]),
    ("HOME_ADDRESS", &["Postal Address", "Address"]),
    ("POSTAL_ADDRESS", &["Postal Address", "Address"]),
    ("ACCOUNTNO", &["Account Number"]),
    ("ACCOUNT_NO", &["Account Number"]),
    ("ACCOUNT_NUMBER", &["Account Number"]),
    ("ACCTNO", &["Account Number"]),
    ("ACCT_NO", &["Account Number"]),
    ("IBAN", &["Account Number", "IBAN"]),
];

/// Uppercase and drop everything outside `[A-Z0-9_]`.
pub fn normalize_name(raw: &str) -> String {
    raw.chars()
        .flat_map(char::to_uppercase)
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || *c == '_')
        .collect()
}

/// Lowercase alphanumerics only, `_` included in what is dropped.
fn fuzzy_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Incremental matcher over one configuration.
///
/// Fields may be pushed in several batches. `finish` appends one `missing` placeholder per
/// element that no field claimed, in configuration order.
pub struct MatchSession {
    elements: Vec<ConfiguredDataElement>,
    consumed: Vec<bool>,
    results: Vec<MatchResult>,
}

impl MatchSession {
    pub fn new(elements: Vec<ConfiguredDataElement>) -> Self {
        let consumed = vec![false; elements.len()];
        Self {
            elements,
            consumed,
            results: Vec::new(),
        }
    }

    /// Elements still available, in configuration order.
    fn pool(&self) -> impl Iterator<Item = (usize, &ConfiguredDataElement)> {
        self.elements
            .iter()
            .enumerate()
            .filter(move |(i, _)| !self.consumed[*i])
    }

    fn find_exact(&self, label: &str) -> Option<usize> {
        self.pool()
            .find(|(_, e)| normalize_name(&e.name) == label)
            .map(|(i, _)| i)
    }

    fn find_mapped(&self, label: &str) -> Option<usize> {
        LABEL_MAPPINGS
            .iter()
            .filter(|(raw, _)| *raw == label)
            .flat_map(|(_, candidates)| candidates.iter())
            .find_map(|candidate| {
                self.pool()
                    .find(|(_, e)| e.name.trim().eq_ignore_ascii_case(candidate))
                    .map(|(i, _)| i)
            })
    }

    fn find_alias(&self, label: &str) -> Option<usize> {
        self.pool()
            .find(|(_, e)| e.aliases.iter().any(|a| normalize_name(a) == label))
            .map(|(i, _)| i)
    }

    fn find_fuzzy(&self, raw_label: &str) -> Option<usize> {
        let label = fuzzy_key(raw_label);
        if label.is_empty() {
            return None;
        }
        self.pool()
            .find(|(_, e)| {
                let name = fuzzy_key(&e.name);
                !name.is_empty() && (label.contains(&name) || name.contains(&label))
            })
            .map(|(i, _)| i)
    }

    fn resolve(&self, raw_label: &str) -> Option<(usize, MatchTier)> {
        let label = normalize_name(raw_label);
        if !label.is_empty() {
            if let Some(i) = self.find_exact(&label) {
                return Some((i, MatchTier::ExactName));
            }
            if let Some(i) = self.find_mapped(&label) {
                return Some((i, MatchTier::MappingTable));
            }
            if let Some(i) = self.find_alias(&label) {
                return Some((i, MatchTier::Alias));
            }
        }
        self.find_fuzzy(raw_label)
            .map(|i| (i, MatchTier::FuzzySubstring))
    }

    /// Match one field and record the result.
    pub fn push(&mut self, field: ExtractedField) -> &MatchResult {
        let result = match self.resolve(&field.label) {
            Some((i, tier)) => {
                self.consumed[i] = true;
                let element = self.elements[i].clone();
                log::debug!(
                    "[Match] '{}' -> '{}' via {:?} ({})",
                    field.label,
                    element.name,
                    tier,
                    mask_snippet(&field.value)
                );
                MatchResult::matched(field, element, tier)
            }
            None => {
                log::debug!("[Match] '{}' left unmatched", field.label);
                MatchResult::unmatched(field)
            }
        };
        self.results.push(result);
        &self.results[self.results.len() - 1]
    }

    pub fn extend<I>(&mut self, fields: I)
    where
        I: IntoIterator<Item = ExtractedField>,
    {
        for field in fields {
            self.push(field);
        }
    }

    /// Number of elements nobody has claimed yet.
    pub fn remaining(&self) -> usize {
        self.consumed.iter().filter(|c| !**c).count()
    }

    /// Close the session, appending placeholders for unclaimed elements.
    pub fn finish(self) -> Vec<MatchResult> {
        let MatchSession {
            elements,
            consumed,
            mut results,
        } = self;

        let mut missing = 0;
        for (element, taken) in elements.into_iter().zip(consumed) {
            if !taken {
                missing += 1;
                results.push(MatchResult::placeholder(element));
            }
        }

        log::info!(
            "[Match] {} result(s), {} missing element(s)",
            results.len(),
            missing
        );
        results
    }
}

/// One-shot matching of a complete field list.
pub fn match_fields(
    fields: Vec<ExtractedField>,
    elements: &[ConfiguredDataElement],
) -> Vec<MatchResult> {
    let mut session = MatchSession::new(elements.to_vec());
    session.extend(fields);
    session.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docveil_types::FieldSource;

    fn field(id: &str, label: &str, value: &str) -> ExtractedField {
        ExtractedField::new(id, label, value, 0, FieldSource::Ocr)
    }

    fn schema() -> Vec<ConfiguredDataElement> {
        vec![
            ConfiguredDataElement::new("e1", "Passport Number"),
            ConfiguredDataElement::new("e2", "Date of Birth"),
            ConfiguredDataElement::new("e3", "Email"),
            ConfiguredDataElement::new("e4", "Last Name").with_aliases(["Nom"]),
            ConfiguredDataElement::new("e5", "Nationality"),
        ]
    }

    type Row = (Option<String>, Option<String>, Option<MatchTier>, bool);

    fn summary(results: &[MatchResult]) -> Vec<Row> {
        results
            .iter()
            .map(|r| {
                (
                    r.field.as_ref().map(|f| f.id.clone()),
                    r.element.as_ref().map(|e| e.id.clone()),
                    r.tier,
                    r.missing,
                )
            })
            .collect()
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Passport No."), "PASSPORTNO");
        assert_eq!(normalize_name("date_of birth"), "DATE_OFBIRTH");
        assert_eq!(normalize_name("  "), "");
    }

    #[test]
    fn test_tiers_in_order() {
        let fields = vec![
            field("f1", "PASSPORT NUMBER", "P1234567"),
            field("f2", "Birth Date", "1985-03-12"),
            field("f3", "NOM", "Doe"),
            field("f4", "E-mail addr", "jane@example.com"),
            field("f5", "Random", "x"),
        ];
        let results = match_fields(fields, &schema());

        assert_eq!(
            summary(&results),
            vec![
                (Some("f1".into()), Some("e1".into()), Some(MatchTier::ExactName), false),
                (Some("f2".into()), Some("e2".into()), Some(MatchTier::MappingTable), false),
                (Some("f3".into()), Some("e4".into()), Some(MatchTier::Alias), false),
                (Some("f4".into()), Some("e3".into()), Some(MatchTier::FuzzySubstring), false),
                (Some("f5".into()), None, None, false),
                (None, Some("e5".into()), None, true),
            ]
        );
    }

    #[test]
    fn test_underscore_codes_use_mapping_table() {
        let elements = vec![
            ConfiguredDataElement::new("e1", "Passport Number"),
            ConfiguredDataElement::new("e2", "Date of Birth"),
            ConfiguredDataElement::new("e3", "Expiry Date"),
        ];
        let fields = vec![
            field("f1", "PASSPORT_NO", "P1234567"),
            field("f2", "DATE_OF_BIRTH", "1985-03-12"),
            field("f3", "expiry_date", "2030-01-01"),
        ];
        let results = match_fields(fields, &elements);

        assert_eq!(
            summary(&results),
            vec![
                (Some("f1".into()), Some("e1".into()), Some(MatchTier::MappingTable), false),
                (Some("f2".into()), Some("e2".into()), Some(MatchTier::MappingTable), false),
                (Some("f3".into()), Some("e3".into()), Some(MatchTier::MappingTable), false),
            ]
        );
    }

    #[test]
    fn test_element_claimed_once() {
        let fields = vec![
            field("f1", "Passport Number", "P1234567"),
            field("f2", "Passport No", "P7654321"),
        ];
        let results = match_fields(fields, &schema());

        let claimed: Vec<_> = results
            .iter()
            .filter(|r| !r.missing)
            .filter_map(|r| r.element.as_ref().map(|e| e.id.as_str()))
            .collect();
        assert_eq!(claimed, vec!["e1"]);
        assert!(results[1].element.is_none());
    }

    #[test]
    fn test_every_field_and_unclaimed_element_once() {
        let elements = schema();
        let fields: Vec<_> = (0..7)
            .map(|i| field(&format!("f{}", i), &format!("Label {}", i), "v"))
            .collect();
        let results = match_fields(fields, &elements);

        assert_eq!(results.len(), 7 + elements.len());
        for i in 0..7 {
            let id = format!("f{}", i);
            let count = results
                .iter()
                .filter(|r| r.field.as_ref().map(|f| f.id == id).unwrap_or(false))
                .count();
            assert_eq!(count, 1);
        }
        let placeholders: Vec<_> = results
            .iter()
            .filter(|r| r.missing)
            .map(|r| r.element.as_ref().unwrap().id.clone())
            .collect();
        assert_eq!(placeholders, vec!["e1", "e2", "e3", "e4", "e5"]);
        assert!(results.iter().filter(|r| r.missing).all(|r| r.value().is_empty()));
    }

    #[test]
    fn test_fuzzy_ignores_empty_keys() {
        let elements = vec![ConfiguredDataElement::new("e1", "---")];
        let results = match_fields(vec![field("f1", "???", "v")], &elements);
        assert!(results[0].element.is_none());
        assert!(results[1].missing);
    }

    #[test]
    fn test_deterministic() {
        let make = || {
            vec![
                field("a", "Email", "x@y.zz"),
                field("b", "Surname", "Doe"),
                field("c", "Nationality of holder", "UTO"),
                field("d", "DOB", "01.01.1990"),
            ]
        };
        let first = summary(&match_fields(make(), &schema()));
        let second = summary(&match_fields(make(), &schema()));
        assert_eq!(first, second);
    }

    #[test]
    fn test_session_batches_match_one_shot() {
        let fields = vec![
            field("f1", "Email", "a@b.cc"),
            field("f2", "DOB", "1990-01-01"),
            field("f3", "Passport", "P1234567"),
        ];

        let mut session = MatchSession::new(schema());
        assert_eq!(session.push(fields[0].clone()).tier, Some(MatchTier::ExactName));
        session.extend(fields[1..].to_vec());
        assert_eq!(session.remaining(), 2);
        let batched = session.finish();

        assert_eq!(summary(&batched), summary(&match_fields(fields, &schema())));
    }
}
