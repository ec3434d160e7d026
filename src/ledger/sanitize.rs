//! The three sanitizing passes over the book element.
//!
//! Each pass touches a disjoint set of book children, so their order does not
//! matter. Missing counter or guid nodes are anomalies: logged in lenient
//! mode, a [`CleanError::Structure`] in strict mode.

use super::error::CleanError;
use super::name::LedgerNames;
use super::tree::Element;
use crate::config::SanitizeMode;
use crate::{debug, log};
use uuid::Uuid;

/// Outcome of a full sanitize run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizeReport {
    pub transactions_removed: usize,
    pub counter_reset: bool,
    pub id_replaced: bool,
    pub schedules_disabled: usize,
}

pub struct Sanitizer<'a> {
    names: &'a LedgerNames,
    mode: SanitizeMode,
}

impl<'a> Sanitizer<'a> {
    pub fn new(names: &'a LedgerNames, mode: SanitizeMode) -> Self {
        Self { names, mode }
    }

    pub fn run(&self, book: &mut Element) -> Result<SanitizeReport, CleanError> {
        let (transactions_removed, counter_reset) = self.remove_transactions(book)?;
        let id_replaced = self.assign_new_id(book)?;
        let schedules_disabled = self.disable_schedules(book);

        Ok(SanitizeReport {
            transactions_removed,
            counter_reset,
            id_replaced,
            schedules_disabled,
        })
    }

    /// Detach all transactions and zero the transaction counter.
    ///
    /// Returns the number removed and whether the counter was found.
    pub fn remove_transactions(&self, book: &mut Element) -> Result<(usize, bool), CleanError> {
        let removed = book.remove_children_named(&self.names.transaction);
        log!("clean"; "removed {} transactions", removed);

        let mut reset = false;
        let counters = book
            .children_named_mut(&self.names.count_data)
            .filter(|node| node.attribute(&self.names.count_type) == Some("transaction"));
        for counter in counters {
            counter.set_text("0");
            log!("clean"; "reset transaction count");
            reset = true;
        }

        if !reset {
            self.anomaly("could not reset the transaction counter")?;
        }
        Ok((removed, reset))
    }

    /// Give the book a fresh random guid (32 lowercase hex digits).
    pub fn assign_new_id(&self, book: &mut Element) -> Result<bool, CleanError> {
        let id = book
            .child_mut(&self.names.book_id)
            .filter(|node| node.attribute(&self.names.id_type) == Some("guid"));

        match id {
            Some(id) => {
                debug!("clean"; "replacing book guid {}", id.text().unwrap_or_default());
                id.set_text(new_guid());
                log!("clean"; "set new guid for book");
                Ok(true)
            }
            None => {
                self.anomaly("could not assign a new guid to the book")?;
                Ok(false)
            }
        }
    }

    /// Force every scheduled transaction's enabled flag to `n`.
    pub fn disable_schedules(&self, book: &mut Element) -> usize {
        let mut disabled = 0;
        for schedule in book.children_named_mut(&self.names.schedxaction) {
            for flag in schedule.children_named_mut(&self.names.sx_enabled) {
                flag.set_text("n");
                disabled += 1;
            }
        }
        log!("clean"; "disabled {} schedules", disabled);
        disabled
    }

    fn anomaly(&self, message: &str) -> Result<(), CleanError> {
        if self.mode.is_strict() {
            return Err(CleanError::Structure(message.to_owned()));
        }
        log!("error"; "{}", message);
        Ok(())
    }
}

fn new_guid() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::name::GNC_URI;
    use crate::ledger::namespace::NamespaceMap;
    use crate::ledger::tree::parse;

    const BOOK: &str = r#"<gnc:book xmlns:gnc="http://www.gnucash.org/XML/gnc" xmlns:book="http://www.gnucash.org/XML/book" xmlns:cd="http://www.gnucash.org/XML/cd" xmlns:sx="http://www.gnucash.org/XML/sx">
<book:id type="guid">00000000000000000000000000000000</book:id>
<gnc:count-data cd:type="account">4</gnc:count-data>
<gnc:count-data cd:type="transaction">2</gnc:count-data>
<gnc:transaction version="2.0.0"/>
<gnc:transaction version="2.0.0"/>
<gnc:schedxaction version="2.0.0"><sx:enabled>y</sx:enabled></gnc:schedxaction>
</gnc:book>"#;

    fn names() -> LedgerNames {
        let mut ns = NamespaceMap::new();
        ns.insert("gnc", GNC_URI);
        LedgerNames::resolve(&ns).unwrap()
    }

    #[test]
    fn test_new_guid_format() {
        let guid = new_guid();
        assert_eq!(guid.len(), 32);
        assert!(guid.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
        assert_ne!(guid, new_guid());
    }

    #[test]
    fn test_remove_transactions_resets_counter() {
        let names = names();
        let mut book = parse(BOOK.as_bytes()).unwrap();
        let sanitizer = Sanitizer::new(&names, SanitizeMode::Lenient);

        assert_eq!(sanitizer.remove_transactions(&mut book).unwrap(), (2, true));
        assert_eq!(book.children_named(&names.transaction).count(), 0);

        let counts: Vec<_> = book
            .children_named(&names.count_data)
            .map(|n| n.text().unwrap_or_default())
            .collect();
        assert_eq!(counts, vec!["4", "0"]);
    }

    #[test]
    fn test_remove_transactions_resets_every_counter() {
        let names = names();
        let doc = BOOK.replace(
            "<gnc:count-data cd:type=\"account\">4</gnc:count-data>",
            "<gnc:count-data cd:type=\"transaction\">2</gnc:count-data>",
        );
        let mut book = parse(doc.as_bytes()).unwrap();
        let sanitizer = Sanitizer::new(&names, SanitizeMode::Strict);

        assert_eq!(sanitizer.remove_transactions(&mut book).unwrap(), (2, true));
        let counts: Vec<_> = book
            .children_named(&names.count_data)
            .map(|n| n.text().unwrap_or_default())
            .collect();
        assert_eq!(counts, vec!["0", "0"]);
    }

    #[test]
    fn test_missing_counter_lenient_and_strict() {
        let names = names();
        let doc = BOOK.replace(
            "<gnc:count-data cd:type=\"transaction\">2</gnc:count-data>",
            "",
        );

        let mut book = parse(doc.as_bytes()).unwrap();
        let lenient = Sanitizer::new(&names, SanitizeMode::Lenient);
        assert_eq!(lenient.remove_transactions(&mut book).unwrap(), (2, false));

        let mut book = parse(doc.as_bytes()).unwrap();
        let strict = Sanitizer::new(&names, SanitizeMode::Strict);
        assert!(matches!(
            strict.remove_transactions(&mut book),
            Err(CleanError::Structure(_))
        ));
    }

    #[test]
    fn test_assign_new_id_requires_guid_type() {
        let names = names();
        let doc = BOOK.replace(r#"type="guid""#, r#"type="new""#);
        let mut book = parse(doc.as_bytes()).unwrap();

        let lenient = Sanitizer::new(&names, SanitizeMode::Lenient);
        assert!(!lenient.assign_new_id(&mut book).unwrap());

        let strict = Sanitizer::new(&names, SanitizeMode::Strict);
        assert!(matches!(
            strict.assign_new_id(&mut book),
            Err(CleanError::Structure(_))
        ));
        let id = book.child(&names.book_id).and_then(Element::text);
        assert_eq!(id, Some("00000000000000000000000000000000"));
    }

    #[test]
    fn test_disable_schedules_leaves_other_nodes() {
        let names = names();
        let mut book = parse(BOOK.as_bytes()).unwrap();
        let before = book.elements().count();

        assert_eq!(Sanitizer::new(&names, SanitizeMode::Lenient).disable_schedules(&mut book), 1);
        assert_eq!(book.elements().count(), before);
        let flag = book
            .child(&names.schedxaction)
            .and_then(|sx| sx.child(&names.sx_enabled))
            .and_then(Element::text);
        assert_eq!(flag, Some("n"));
    }

    #[test]
    fn test_run_report() {
        let names = names();
        let mut book = parse(BOOK.as_bytes()).unwrap();
        let report = Sanitizer::new(&names, SanitizeMode::Strict)
            .run(&mut book)
            .unwrap();

        assert_eq!(
            report,
            SanitizeReport {
                transactions_removed: 2,
                counter_reset: true,
                id_replaced: true,
                schedules_disabled: 1,
            }
        );
    }
}
