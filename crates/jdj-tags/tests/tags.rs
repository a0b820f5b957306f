//! `csrf_token`, `static`, `url`, `now`, localization and the `Compat` bundle.

use std::sync::Arc;
use std::thread;

use chrono::{FixedOffset, TimeZone, Utc};
use jdj_core::error::JdjError;
use jdj_core::locale::LocaleContext;
use jdj_tags::{Bundle, Runtime, TagExtension};
use jdj_template::{Context, ContextValue, Environment, Finalizer};
use jdj_test::fakes::{FixedClock, RecordingUrls};
use jdj_test::harness::{environment, locale, render, render_in, runtime};
use jdj_test::recording::UrlCall;

fn s(value: &str) -> ContextValue {
    ContextValue::from(value)
}

// ── csrf_token ───────────────────────────────────────────────────────

#[test]
fn csrf_token_renders_hidden_input() {
    let (env, _) = environment(Bundle::Csrf);
    let out = render(&env, "{% csrf_token %}", [("csrf_token", s("a_csrf_token"))]).unwrap();
    assert_eq!(
        out,
        r#"<input type="hidden" name="csrfmiddlewaretoken" value="a_csrf_token" />"#
    );
}

#[test]
fn csrf_token_missing_or_not_provided() {
    let (env, _) = environment(Bundle::Csrf);
    assert_eq!(render(&env, "{% csrf_token %}", []).unwrap(), "");
    assert_eq!(
        render(&env, "{% csrf_token %}", [("csrf_token", s("NOTPROVIDED"))]).unwrap(),
        ""
    );
}

#[test]
fn csrf_token_is_not_escaped_twice() {
    let (mut env, _) = environment(Bundle::Csrf);
    env.set_auto_escape(true);
    let out = render(&env, "{% csrf_token %}", [("csrf_token", s("tok"))]).unwrap();
    assert!(out.starts_with("<input"), "{out}");
}

// ── static ───────────────────────────────────────────────────────────

#[test]
fn static_resolves_path() {
    let (env, fakes) = environment(Bundle::Static);
    assert_eq!(render(&env, "{% static 'static.png' %}", []).unwrap(), "Static: static.png");
    assert_eq!(fakes.statics.log().last().as_deref(), Some("static.png"));
}

#[test]
fn static_as_binds_once() {
    let (env, fakes) = environment(Bundle::Static);
    let out = render(
        &env,
        "{% static 'static.png' as my_url %}My url is: {{ my_url }}!{{ my_url }}",
        [],
    )
    .unwrap();
    assert_eq!(out, "My url is: Static: static.png!Static: static.png");
    assert_eq!(fakes.statics.log().len(), 1);
}

#[test]
fn static_path_from_variable() {
    let (env, _) = environment(Bundle::Static);
    let out = render(&env, "{% static path %}", [("path", s("css/app.css"))]).unwrap();
    assert_eq!(out, "Static: css/app.css");
}

#[test]
fn static_requires_a_path() {
    let (env, fakes) = environment(Bundle::Static);
    for source in ["{% static as %}", "{% static as my_url %}"] {
        let err = env.from_string(source).unwrap_err();
        assert!(err.is_syntax_error(), "{source}");
        assert!(err.to_string().contains("'static' tag requires a path"), "{source}: {err}");
    }
    assert!(fakes.statics.log().is_empty());
}

#[test]
fn static_default_prefix() {
    let env = Environment::new().with_extension(TagExtension::new(Bundle::Static, Runtime::new()));
    let out = render(&env, "{% static '/img/a.png' %}", []).unwrap();
    assert_eq!(out, "/static/img/a.png");
}

// ── url ──────────────────────────────────────────────────────────────

#[test]
fn url_without_arguments() {
    let (env, fakes) = environment(Bundle::Url);
    assert_eq!(render(&env, "{% url 'my_view' %}", []).unwrap(), "Url for: my_view");
    fakes.urls.log().assert_called_with(&UrlCall::new("my_view", &[], &[]));
}

#[test]
fn url_positional_arguments() {
    let (env, fakes) = environment(Bundle::Url);
    let expected = UrlCall::new("my_view", &["foo", "bar"], &[]);
    let cases = [
        ("{% url 'my_view' 'foo' 'bar' %}", vec![]),
        ("{% url 'my_view' arg1 'bar' %}", vec![("arg1", s("foo"))]),
        ("{% url 'my_view' arg1 arg2 %}", vec![("arg1", s("foo")), ("arg2", s("bar"))]),
    ];
    for (source, vars) in cases {
        assert_eq!(render(&env, source, vars).unwrap(), "Url for: my_view", "{source}");
        fakes.urls.log().assert_called_with(&expected);
    }
}

#[test]
fn url_keyword_arguments() {
    let (env, fakes) = environment(Bundle::Url);
    let expected = UrlCall::new("my_view", &[], &[("kw1", "foo"), ("kw2", "bar")]);
    let cases = [
        ("{% url 'my_view' kw1='foo' kw2='bar' %}", vec![]),
        ("{% url 'my_view' kw1=arg1 kw2='bar' %}", vec![("arg1", s("foo"))]),
        ("{% url 'my_view' kw1=arg1 kw2=arg2 %}", vec![("arg1", s("foo")), ("arg2", s("bar"))]),
    ];
    for (source, vars) in cases {
        assert_eq!(render(&env, source, vars).unwrap(), "Url for: my_view", "{source}");
        fakes.urls.log().assert_called_with(&expected);
    }
}

#[test]
fn url_dotted_arguments() {
    let (env, fakes) = environment(Bundle::Url);
    let foo = with_bar("argument");

    render(&env, "{% url 'my_view' foo.bar %}", [("foo", foo.clone())]).unwrap();
    fakes.urls.log().assert_called_with(&UrlCall::new("my_view", &["argument"], &[]));

    render(&env, "{% url 'my_view' kw1=foo.bar %}", [("foo", foo)]).unwrap();
    fakes
        .urls
        .log()
        .assert_called_with(&UrlCall::new("my_view", &[], &[("kw1", "argument")]));
}

fn with_bar(bar: &str) -> ContextValue {
    ContextValue::Dict([("bar".to_string(), s(bar))].into_iter().collect())
}

#[test]
fn url_as_binds_the_result() {
    let (env, fakes) = environment(Bundle::Url);
    let log = fakes.urls.log();
    let expected = "Url: Url for: my_view";

    assert_eq!(render(&env, "{% url 'my_view' as my_url %}Url: {{ my_url }}", []).unwrap(), expected);
    log.assert_called_with(&UrlCall::new("my_view", &[], &[]));

    let out = render(
        &env,
        "{% url 'my_view' arg1 'bar' as my_url %}Url: {{ my_url }}",
        [("arg1", s("foo"))],
    )
    .unwrap();
    assert_eq!(out, expected);
    log.assert_called_with(&UrlCall::new("my_view", &["foo", "bar"], &[]));

    let out = render(
        &env,
        "{% url 'my_view' kw1=arg1 kw2='bar' as my_url %}Url: {{ my_url }}",
        [("arg1", s("foo"))],
    )
    .unwrap();
    assert_eq!(out, expected);
    log.assert_called_with(&UrlCall::new("my_view", &[], &[("kw1", "foo"), ("kw2", "bar")]));
}

#[test]
fn url_syntax_errors() {
    let (env, _) = environment(Bundle::Url);
    let cases = [
        ("{% url 'my_view' kw1='foo' 123 %}", "got 'integer', expected name for keyword argument"),
        ("{% url 'my_view' 'foo' kw1='bar' %}", "url arguments must be all positional or all keyword"),
        ("{% url 'my_view' kw1='foo' bar %}", "url arguments must be all positional or all keyword"),
        ("{% url 'my_view' kw1='a' kw1='b' %}", "keyword argument 'kw1' repeated"),
        ("{% url as u %}", "'url' tag requires a view name"),
    ];
    for (source, message) in cases {
        let err = env.from_string(source).unwrap_err();
        assert!(err.is_syntax_error(), "{source}");
        assert!(err.to_string().contains(message), "{source}: {err}");
    }
}

#[test]
fn url_reversal_failure_propagates() {
    let fakes = runtime().with_urls(RecordingUrls::new().without("gone"));
    let env = fakes.environment(&[Bundle::Url]);
    let err = render(&env, "{% url 'gone' %}", []).unwrap_err();
    assert!(matches!(err, JdjError::NoReverseMatch(ref name) if name == "gone"));
    assert_eq!(err.to_string(), "Reverse for 'gone' not found");
    assert_eq!(fakes.urls.log().len(), 1);
}

#[test]
fn url_default_runtime_has_no_routes() {
    let env = Environment::new().with_extension(TagExtension::new(Bundle::Url, Runtime::new()));
    let err = render(&env, "{% url 'home' %}", []).unwrap_err();
    assert!(matches!(err, JdjError::NoReverseMatch(_)));
}

// ── now ──────────────────────────────────────────────────────────────

#[test]
fn now_formats_clock_time() {
    let (env, _) = environment(Bundle::Now);
    assert_eq!(render(&env, "{% now 'Y-m-d H:i' %}", []).unwrap(), "2000-10-01 14:10");
    assert_eq!(render(&env, "{% now 'N j, Y, P' %}", []).unwrap(), "Oct. 1, 2000, 2:10 p.m.");
}

#[test]
fn now_uses_active_time_zone() {
    let (env, _) = environment(Bundle::Now);
    let out = render_in(&env, "{% now 'H:i O' %}", [], locale("en").with_offset_seconds(2 * 3600)).unwrap();
    assert_eq!(out, "16:10 +0200");
}

#[test]
fn now_as_binds_the_result() {
    let fixed = Utc.with_ymd_and_hms(2024, 2, 29, 8, 0, 0).unwrap();
    let fakes = runtime().with_clock(FixedClock(fixed));
    let env = fakes.environment(&[Bundle::Now]);
    let out = render(&env, "{% now 'Y' as year %}(c) {{ year }}", []).unwrap();
    assert_eq!(out, "(c) 2024");
}

#[test]
fn now_requires_string_format() {
    let (env, _) = environment(Bundle::Now);
    let err = env.from_string("{% now fmt %}").unwrap_err();
    assert!(err.is_syntax_error());
}

// ── localization ─────────────────────────────────────────────────────

#[test]
fn numbers_follow_the_language() {
    let (env, fakes) = environment(Bundle::L10n);
    let vars = [("n", ContextValue::Float(1.23))];
    assert_eq!(render_in(&env, "{{ n }}", vars.clone(), locale("de")).unwrap(), "1,23");
    assert_eq!(render_in(&env, "{{ n }}", vars, locale("en")).unwrap(), "1.23");
    fakes.localizer.log().assert_called_with(&ContextValue::Float(1.23));
}

#[test]
fn strings_are_not_localized() {
    let (env, fakes) = environment(Bundle::L10n);
    let out = render_in(&env, "{{ v }}", [("v", s("1.23"))], locale("de")).unwrap();
    assert_eq!(out, "1.23");
    assert!(fakes.localizer.log().is_empty());
}

#[test]
fn localization_can_be_switched_off() {
    let (env, _) = environment(Bundle::L10n);
    let out = render_in(
        &env,
        "{{ n }}",
        [("n", ContextValue::Float(1.5))],
        locale("de").with_l10n(false),
    )
    .unwrap();
    assert_eq!(out, "1.5");
}

#[test]
fn datetimes_are_converted_then_localized() {
    let (env, _) = environment(Bundle::L10n);
    let noon = FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2000, 10, 1, 12, 0, 0)
        .unwrap();
    let vars = [("when", ContextValue::DateTime(noon))];

    let out = render_in(&env, "{{ when }}", vars.clone(), locale("en").with_offset_seconds(-3 * 3600)).unwrap();
    assert_eq!(out, "Oct. 1, 2000, 9 a.m.");

    let out = render_in(&env, "{{ when }}", vars, locale("en")).unwrap();
    assert_eq!(out, "Oct. 1, 2000, noon");
}

struct Triple;

impl Finalizer for Triple {
    fn finalize(&self, value: ContextValue, _locale: &LocaleContext) -> ContextValue {
        match value {
            ContextValue::Float(f) => ContextValue::Float(f * 3.0),
            other => other,
        }
    }
}

#[test]
fn existing_finalizer_runs_first() {
    let fakes = runtime();
    let mut env = Environment::new();
    env.add_finalizer(Triple);
    env.add_extension(TagExtension::new(Bundle::L10n, fakes.runtime()));
    assert_eq!(env.finalizer_count(), 3);

    let out = render_in(&env, "{{ n }}", [("n", ContextValue::Float(0.5))], locale("de")).unwrap();
    assert_eq!(out, "1,5");
    fakes.localizer.log().assert_called_with(&ContextValue::Float(1.5));
}

// ── compat ───────────────────────────────────────────────────────────

#[test]
fn compat_registers_every_tag() {
    let fakes = runtime();
    let env = fakes.environment(&[Bundle::Compat]);
    let cases = [
        ("{% csrf_token %}", r#"<input type="hidden" name="csrfmiddlewaretoken" value="t" />"#),
        ("{% trans 'Hi' %}", "Hi - translated"),
        ("{% blocktrans %}Hi{% endblocktrans %}", "Hi - translated"),
        ("{% now 'Y' %}", "2000"),
        ("{% static 'a.png' %}", "Static: a.png"),
        ("{% url 'home' %}", "Url for: home"),
        ("{{ _('Hi') }}", "Hi - translated"),
    ];
    for (source, expected) in cases {
        let out = render(&env, source, [("csrf_token", s("t"))]).unwrap();
        assert_eq!(out, expected, "{source}");
    }
    assert_eq!(env.finalizer_count(), 2);
}

#[test]
fn bundles_only_claim_their_tags() {
    let (env, _) = environment(Bundle::Static);
    let err = env.from_string("{% url 'home' %}").unwrap_err();
    assert!(err.is_syntax_error());
}

#[test]
fn rendering_is_thread_safe() {
    let fakes = runtime();
    let env = Arc::new(fakes.environment(&[Bundle::Compat]));

    let handles: Vec<_> = (0..4)
        .map(|n| {
            let env = Arc::clone(&env);
            thread::spawn(move || {
                let mut ctx = Context::from_pairs([("n", n)]);
                env.from_string("{% url 'v' n %}|{% trans 'x' %}")
                    .unwrap()
                    .render(&mut ctx)
                    .unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), "Url for: v|x - translated");
    }
    assert_eq!(fakes.urls.log().len(), 4);
    assert_eq!(fakes.translator.log().len(), 4);
}
