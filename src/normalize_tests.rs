use super::{normalize_rows, parse_json_or, parse_tags, pick_body};
use crate::model::{AltCaption, Platform};
use serde_json::{json, Value};

#[test]
fn flat_row_uses_korean_columns() {
    let rows = vec![json!({
        "콘텐츠ID": "C-1",
        "플랫폼": "naver_blog",
        "제목": "Spring menu",
        "본문HTML": "<p>hello</p>",
        "태그": "#food, spring,, #menu ",
        "상태": "pending",
        "시도횟수": "2",
        "이미지파일(JSON)": "[\"c1/1.jpg\", \"c1/2.jpg\"]",
        "ALT/캡션(JSON)": "[{\"idx\":1,\"alt\":\"plate\",\"caption\":\"lunch\"}]",
        "기타메타(JSON)": "{\"seo\": 88}"
    })];

    let normalized = normalize_rows(&rows);
    assert!(normalized.dropped.is_empty());
    let item = &normalized.items[0];
    assert_eq!(item.content_id, "C-1");
    assert_eq!(item.platform, Some(Platform::NaverBlog));
    assert_eq!(item.title, "Spring menu");
    assert_eq!(item.body, "<p>hello</p>");
    assert_eq!(item.tags, vec!["food", "spring", "menu"]);
    assert_eq!(item.status, "pending");
    assert_eq!(item.attempts, 2);
    assert_eq!(item.image_files, vec!["c1/1.jpg", "c1/2.jpg"]);
    assert_eq!(item.alt_captions[0].alt, "plate");
    assert_eq!(item.extra_meta, json!({"seo": 88}));
    assert_eq!(item.image_meta, json!({}));
}

#[test]
fn english_aliases_and_numeric_ids_are_accepted() {
    let rows = vec![json!({"contentId": 42, "platform": "tistory", "text": "plain", "attempts": 3})];
    let item = &normalize_rows(&rows).items[0];
    assert_eq!(item.content_id, "42");
    assert_eq!(item.platform, Some(Platform::Tistory));
    assert_eq!(item.body, "plain");
    assert_eq!(item.attempts, 3);
}

#[test]
fn nested_sub_rows_inherit_identifier_and_platform() {
    let rows = vec![json!({
        "콘텐츠ID": "G-1",
        "제목": "shared title",
        "rows": [
            {"플랫폼": "naver_blog", "본문HTML": "naver body"},
            {"플랫폼": "tistory", "콘텐츠ID": "G-1b"},
            {"본문HTML": "no platform"}
        ]
    })];

    let normalized = normalize_rows(&rows);
    let ids: Vec<_> = normalized
        .items
        .iter()
        .map(|item| item.content_id.as_str())
        .collect();
    assert_eq!(ids, vec!["G-1", "G-1b", "G-1"]);
    assert_eq!(normalized.items[0].title, "shared title");
    assert_eq!(normalized.items[0].body, "naver body");
    assert_eq!(normalized.items[1].platform, Some(Platform::Tistory));
    assert!(normalized.items[2].has_blank_platform());
    assert_eq!(normalized.items[2].platform, None);
}

#[test]
fn sub_rows_without_identifier_are_dropped_and_reported() {
    let rows = vec![
        json!({"rows": [{"플랫폼": "threads"}, "junk", {"콘텐츠ID": "ok"}]}),
        json!("not a record"),
        json!({"콘텐츠ID": "   "}),
    ];

    let normalized = normalize_rows(&rows);
    assert_eq!(normalized.items.len(), 1);
    assert_eq!(normalized.items[0].content_id, "ok");
    let dropped: Vec<_> = normalized
        .dropped
        .iter()
        .map(|row| (row.index, row.sub_index))
        .collect();
    assert_eq!(dropped, vec![(0, Some(0)), (0, Some(1)), (1, None), (2, None)]);
}

#[test]
fn unknown_platform_label_is_kept_but_not_parsed() {
    let rows = vec![json!({"콘텐츠ID": "X", "플랫폼": "myspace"})];
    let item = &normalize_rows(&rows).items[0];
    assert_eq!(item.platform, None);
    assert_eq!(item.platform_label, "myspace");
    assert!(!item.has_blank_platform());
}

#[test]
fn body_falls_back_through_candidates() {
    let row = json!({"본문HTML": "  ", "내용(원문)": "", "html": "<b>h</b>", "text": "t"});
    assert_eq!(pick_body(row.as_object().unwrap(), None), "<b>h</b>");

    let row = json!({"text": "only text"});
    assert_eq!(pick_body(row.as_object().unwrap(), None), "only text");

    let row = json!({});
    let parent = json!({"내용(원문)": "from parent"});
    assert_eq!(
        pick_body(row.as_object().unwrap(), parent.as_object()),
        "from parent"
    );
    assert_eq!(pick_body(row.as_object().unwrap(), None), "");
}

#[test]
fn lenient_json_returns_fallback_on_bad_input() {
    let bad = Value::String("[not json".to_string());
    assert!(parse_json_or::<Vec<String>>(Some(&bad), Vec::new()).is_empty());
    assert!(parse_json_or::<Vec<String>>(None, Vec::new()).is_empty());
    let wrong_shape = Value::String("{\"a\":1}".to_string());
    assert!(parse_json_or::<Vec<String>>(Some(&wrong_shape), Vec::new()).is_empty());
    let number = json!(5);
    assert!(parse_json_or::<Vec<AltCaption>>(Some(&number), Vec::new()).is_empty());

    let decoded = json!(["a.png"]);
    assert_eq!(
        parse_json_or::<Vec<String>>(Some(&decoded), Vec::new()),
        vec!["a.png"]
    );
}

#[test]
fn tags_are_trimmed_and_stripped() {
    assert_eq!(parse_tags(""), Vec::<String>::new());
    assert_eq!(parse_tags("#a,#b , , c"), vec!["a", "b", "c"]);
    assert_eq!(parse_tags(" # spaced "), vec!["spaced"]);
}
