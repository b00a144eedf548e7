use benchlog_core::parse::MetricClassifier;
use benchlog_core::{MetricField, MetricValue};
use proptest::prelude::*;

fn float_field() -> impl Strategy<Value = MetricField> {
    prop::sample::select(
        MetricField::ALL
            .into_iter()
            .filter(|f| *f != MetricField::RunTimeMs)
            .collect::<Vec<_>>(),
    )
}

fn line(field: MetricField, value: &str) -> String {
    format!("[{}], {}, {}", field.category().tag(), field.name(), value)
}

proptest! {
    #[test]
    fn float_values_are_recovered_exactly(field in float_field(), v in -1.0e12f64..1.0e12) {
        let sample = MetricClassifier::all().classify(&line(field, &v.to_string())).unwrap();
        prop_assert_eq!(sample.field, field);
        prop_assert_eq!(sample.value, MetricValue::Float(v));
    }

    #[test]
    fn integer_runtime_is_recovered_exactly(v in any::<i64>()) {
        let sample = MetricClassifier::all()
            .classify(&line(MetricField::RunTimeMs, &v.to_string()))
            .unwrap();
        prop_assert_eq!(sample.value, MetricValue::Int(v));
    }

    #[test]
    fn non_numeric_tail_never_classifies(field in float_field(), tail in "[a-zA-Z ]{0,12}") {
        prop_assert!(MetricClassifier::all().classify(&line(field, &tail)).is_none());
    }

    #[test]
    fn arbitrary_text_does_not_panic(s in "\\PC{0,80}") {
        let _ = MetricClassifier::all().classify_line(&s);
    }
}
