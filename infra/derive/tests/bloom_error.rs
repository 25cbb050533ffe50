use std::borrow::Cow;

#[bloom_derive::bloom_error]
pub enum SampleError {
    #[error("Parse error{}: {source}", format_context(.context))]
    Parse {
        #[source]
        source: std::num::ParseIntError,
        context: Option<Cow<'static, str>>,
    },

    #[error("Rejected{}: {message}", format_context(.context))]
    Rejected { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal fault{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

#[test]
fn source_errors_convert_via_question_mark() {
    fn parse(input: &str) -> Result<i64, SampleError> {
        Ok(input.parse::<i64>()?)
    }

    assert_eq!(parse("42").unwrap(), 42);
    let err = parse("nope").unwrap_err();
    assert!(matches!(err, SampleError::Parse { context: None, .. }));
}

#[test]
fn context_is_attached_to_source_results() {
    let result: Result<i64, _> = "nope".parse::<i64>();
    let err = result.context("reading slot step").unwrap_err();
    match err {
        SampleError::Parse { context, .. } => {
            assert_eq!(context.as_deref(), Some("reading slot step"));
        },
        other => panic!("unexpected variant: {other:?}"),
    }
}

#[test]
fn context_is_attached_to_domain_results() {
    let result: Result<(), SampleError> =
        Err(SampleError::Rejected { message: "closed".into(), context: None });
    let err = result.context("tuesday schedule").unwrap_err();
    match err {
        SampleError::Rejected { message, context } => {
            assert_eq!(message, "closed");
            assert_eq!(context.as_deref(), Some("tuesday schedule"));
        },
        other => panic!("unexpected variant: {other:?}"),
    }
}

#[test]
fn internal_variant_accepts_strings() {
    let from_static: SampleError = "boom".into();
    assert!(matches!(from_static, SampleError::Internal { .. }));

    let from_owned: SampleError = String::from("boom").into();
    let rendered = from_owned.to_string();
    assert!(rendered.contains("boom"), "display should include the message: {rendered}");
}

#[test]
fn display_includes_context_suffix() {
    let err = SampleError::Rejected { message: "closed".into(), context: Some("monday".into()) };
    assert_eq!(err.to_string(), "Rejected (monday): closed");
}

#[test]
fn bloom_error_ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/bloom_error_pass.rs");
}
