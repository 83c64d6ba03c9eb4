use temple_core::prelude::*;

const EXAMPLE_PAGE: &str = r#"<html>
<head>
        {{$views/head.tmpl.html}}
</head>
<body>
{{$views/header.tmpl.html}}
<p>
        {{page_content}}
</p>
</body>
</html>
"#;

const EXPECTED: &str = r#"<html>
<head>
        <title>Example Page Title</title>
</head>
<body>
<h1>Example Page Title</h1>
<hr />
<p>
        This is some example page content.
</p>
</body>
</html>
"#;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("Temple Page Demo");
    println!("----------------");

    // 1. Project templates, keyed by their project-root paths
    let source = MemorySource::new()
        .with_template("views/example.tmpl.html", EXAMPLE_PAGE)
        .with_template("views/head.tmpl.html", "<title>{{page_title}}</title>\n")
        .with_template("views/header.tmpl.html", "<h1>{{page_title}}</h1>\n<hr />\n");

    // 2. Bindings are shared by the page and everything it imports
    let bindings = Bindings::new()
        .set("page_title", "Example Page Title")
        .set("page_content", "This is some example page content.");

    let loader = TemplateLoader::new(source).with_config(LoaderConfig::from_env());
    let output = loader.load("views/example.tmpl.html", &bindings)?;

    print!("{}", output);
    assert_eq!(output, EXPECTED);
    println!("\nPage rendered as expected.");

    Ok(())
}
