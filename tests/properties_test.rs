//! Property tests for fixed-width formatting and parse/render symmetry.

use ach_engine::formatter::RULES;
use ach_engine::{parse, AchFile, Attributes, FieldRuleRegistry, FieldValue, RECORD_SIZE};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct EntrySpec {
    code: i64,
    routing: String,
    amount: i64,
    name: String,
    trace: String,
    addenda: Vec<String>,
}

fn arb_entry() -> impl Strategy<Value = EntrySpec> {
    (
        prop::sample::select(vec![22i64, 23, 27, 28, 32, 37]),
        "[0-9]{9}",
        0i64..10_000_000_000,
        "[A-Z][A-Z ]{0,21}",
        "[0-9]{15}",
        prop::collection::vec("[A-Z0-9 ]{0,80}", 0..3),
    )
        .prop_map(|(code, routing, amount, name, trace, addenda)| EntrySpec {
            code,
            routing,
            amount,
            name,
            trace,
            addenda,
        })
}

fn arb_batches() -> impl Strategy<Value = Vec<Vec<EntrySpec>>> {
    prop::collection::vec(prop::collection::vec(arb_entry(), 0..5), 0..4)
}

fn build(batches: &[Vec<EntrySpec>]) -> AchFile {
    let mut file = AchFile::new(
        Attributes::new()
            .with("company_id", "11-11111")
            .with("company_name", "MY COMPANY")
            .with("immediate_dest", "123123123")
            .with("immediate_dest_name", "COMMERCE BANK")
            .with("immediate_origin", "123123123")
            .with("immediate_origin_name", "MYCOMPANY")
            .with("origin_dfi_id", "12312312")
            .with("company_entry_descr", "PAYROLL"),
    )
    .unwrap();

    for entries in batches {
        file.batch_with(Attributes::new().with("entry_class_code", "PPD"), |batch| {
            for entry in entries {
                batch.entry(
                    Attributes::new()
                        .with("transaction_code", entry.code)
                        .with("routing_number", entry.routing.as_str())
                        .with("bank_account", "987654")
                        .with("amount", entry.amount)
                        .with("customer_name", entry.name.as_str())
                        .with("trace_num", entry.trace.as_str()),
                )?;
                for info in &entry.addenda {
                    batch.addenda(Attributes::new().with("payment_related_info", info.as_str()))?;
                }
            }
            Ok(())
        })
        .unwrap();
    }
    file
}

proptest! {
    #[test]
    fn every_rule_renders_its_width(text in "[ -~]{0,120}") {
        let rules = FieldRuleRegistry::standard();
        for (field, _) in RULES {
            let width = rules.compile(field).unwrap().width;
            let rendered = rules.format(field, &FieldValue::Text(text.clone())).unwrap();
            prop_assert_eq!(rendered.chars().count(), width, "field {}", field);
        }
    }

    #[test]
    fn numbers_render_their_width(n in 0i64..i64::MAX) {
        let rules = FieldRuleRegistry::standard();
        for field in ["amount", "entry_hash", "total_debit_amount", "batch_number"] {
            let width = rules.compile(field).unwrap().width;
            let rendered = rules.format(field, &FieldValue::Number(n)).unwrap();
            let padded = format!("{:0>width$}", n, width = width);
            prop_assert_eq!(rendered.as_str(), &padded[padded.len() - width..]);
        }
    }

    #[test]
    fn rendered_files_are_blocked(batches in arb_batches()) {
        let file = build(&batches);
        let lines = file.to_lines().unwrap();

        prop_assert_eq!(lines.len() % 10, 0);
        prop_assert!(lines.iter().all(|line| line.len() == RECORD_SIZE));
        let filler = "9".repeat(RECORD_SIZE);
        let records = lines.iter().filter(|line| **line != filler).count();
        prop_assert_eq!(file.record_count() as usize, records);
    }

    #[test]
    fn parse_then_render_is_identity(batches in arb_batches()) {
        let file = build(&batches);
        let lines = file.to_lines().unwrap();
        let parsed = parse(lines.clone()).unwrap();

        prop_assert_eq!(parsed.to_lines().unwrap(), lines);
        prop_assert_eq!(parsed.batches().len(), batches.len());
        for (batch, entries) in parsed.batches().iter().zip(&batches) {
            prop_assert_eq!(batch.entries().len(), entries.len());
            for (index, entry) in entries.iter().enumerate() {
                prop_assert_eq!(batch.addendas_for(index).len(), entry.addenda.len());
            }
        }
    }

    #[test]
    fn batch_numbers_are_gapless(batches in arb_batches()) {
        let file = build(&batches);
        for (index, batch) in file.batches().iter().enumerate() {
            prop_assert_eq!(batch.batch_number(), Some(index as i64 + 1));
        }
    }

    #[test]
    fn entry_hash_sums_routing_prefixes(batches in arb_batches()) {
        let file = build(&batches);
        for (batch, entries) in file.batches().iter().zip(&batches) {
            let expected: i64 = entries
                .iter()
                .map(|entry| entry.routing.parse::<i64>().unwrap() / 10)
                .sum();
            prop_assert_eq!(batch.entry_hash().unwrap(), expected);
        }
    }
}
