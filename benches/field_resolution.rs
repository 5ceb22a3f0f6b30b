use course_harvest_lib::infrastructure::parsing::config::DetailSelectors;
use course_harvest_lib::infrastructure::parsing::{PhraseConfig, RecordAssembler};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const SAMPLE_PAGE: &str = r#"<html lang="en"><head>
<title>Machine Learning | Coursera</title>
<meta property="og:description" content="Build your subject-matter expertise. Learn machine learning fundamentals.">
<script type="application/ld+json">
{"@context":"https://schema.org","@type":"Course","name":"Machine Learning",
 "provider":{"@type":"Organization","name":"Stanford University"},
 "aggregateRating":{"@type":"AggregateRating","ratingValue":4.9,"ratingCount":190000}}
</script>
</head><body>
<nav><ol><li><a href="/">Home</a></li><li><a href="/browse">Browse</a></li>
<li><a href="/browse/data-science">Data Science</a></li><li><a href="/browse/data-science/ml">Machine Learning</a></li></ol></nav>
<h1>Machine Learning</h1>
<div data-testid="rating">4.9</div>
<div data-testid="level">Beginner level</div>
<p>Approx. 33 hours to complete</p>
<p>4,812,233 already enrolled</p>
<h2>About this Course</h2>
<p>Supervised learning, unsupervised learning and best practices in machine learning. Gain a foundational understanding of a subject.</p>
<div data-testid="module"><h3>Introduction to Machine Learning</h3></div>
<div data-testid="module"><h3>Regression with multiple input variables</h3></div>
<div data-testid="module"><h3>Classification</h3></div>
<p>Offered by Stanford University. Stanford has been one of the world's leading universities.</p>
</body></html>"#;

fn assemble_benchmark(c: &mut Criterion) {
    let assembler = RecordAssembler::from_config(&DetailSelectors::default(), &PhraseConfig::default(), "Coursera", 5000)
        .expect("default configuration compiles");

    c.bench_function("assemble_course_page", |b| {
        b.iter(|| assembler.assemble(black_box("https://www.coursera.org/learn/machine-learning"), black_box(SAMPLE_PAGE)));
    });

    c.bench_function("assemble_empty_page", |b| {
        b.iter(|| assembler.assemble(black_box("https://www.coursera.org/learn/x"), black_box("<html></html>")));
    });
}

criterion_group!(benches, assemble_benchmark);
criterion_main!(benches);
