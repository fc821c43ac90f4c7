//! Time-series charts for report pages, rendered client-side by YUI from a
//! CSV file whose first column is a millisecond timestamp.

pub const DEFAULT_CHART_NAME: &str = "chart";
pub const DEFAULT_WIDTH: u32 = 960;
pub const DEFAULT_HEIGHT: u32 = 550;

const YUI_URL: &str = "http://yui.yahooapis.com/3.17.2/build/yui/yui-min.js";

/// Style and script tags for the page `<head>`.
pub fn make_chart_header(chart_name: &str, width: u32, height: u32) -> String {
  format!(
    r#"<style type="text/css">
    #{chart_name} {{
        width: {width}px;
        height: {height}px;
    }}
</style>
<script src="{YUI_URL}">
</script>
"#
  )
}

/// The chart container and the script that loads `source` into it, one
/// line series per key.
pub fn make_chart(source: &str, keys: &[&str], chart_name: &str) -> String {
  let join = |render: &dyn Fn(&str) -> String| keys.iter().map(|key| render(*key)).collect::<Vec<_>>().join(", ");
  let series_keys = join(&|key| format!("\"{key}\""));
  let series_styles = join(&|key| format!("\"{key}\": {{ line: {{ weight: \"2mm\" }} }}"));
  let schema_fields = join(&|key| format!("{{key: \"{key}\", parser: parseNum}}"));

  format!(
    r##"<div id="{chart_name}"></div>
<script>
YUI().use(['charts-legend', 'datasource'], function (Y) {{
    var chart = new Y.Chart({{
        dataProvider: [],
        render: "#{chart_name}",
        styles: {{
            axes: {{
                time: {{
                    label: {{ rotation: -45, color: "#000000" }}
                }},
                values: {{
                    label: {{ color: "#000000" }},
                    alwaysShowZero: true,
                    scaleType: "logarithmic"
                }}
            }},
            series: {{
                {series_styles}
            }}
        }},
        categoryKey: "time",
        categoryType: "time",
        valueAxisName: "values",
        seriesKeys: [ {series_keys} ],
        showMarkers: false,
        legend: {{ position: "bottom" }}
    }});

    var parseDate = function (val) {{ return new Date(+val); }};
    var parseNum = function (val) {{ return +val; }};

    var csv = new Y.DataSource.IO({{source: "{source}"}});
    csv.plug(Y.Plugin.DataSourceTextSchema, {{
        schema: {{
            resultDelimiter: "\n",
            fieldDelimiter: ",",
            resultFields: [
                {{key: "time", parser: parseDate}},
                {schema_fields}
            ]}}}});
    csv.sendRequest({{request: "", on: {{
        success: function (e) {{
            e.response.results.shift();  // remove CSV header
            chart.set("dataProvider", e.response.results);
        }},
        failure: function (e) {{
            console.log("Failed to fetch {source}: " +
                        e.error.message);
        }}}}}});
}});
</script>
"##
  )
}

/// A complete HTML document holding one chart.
pub fn render_page(title: &str, source: &str, keys: &[&str]) -> String {
  format!(
    "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n{header}</head>\n<body>\n<h1>{title}</h1>\n{chart}</body>\n</html>\n",
    header = make_chart_header(DEFAULT_CHART_NAME, DEFAULT_WIDTH, DEFAULT_HEIGHT),
    chart = make_chart(source, keys, DEFAULT_CHART_NAME),
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn header_sizes_the_chart() {
    insta::assert_snapshot!(make_chart_header("nbs", 640, 480), @r##"
    <style type="text/css">
        #nbs {
            width: 640px;
            height: 480px;
        }
    </style>
    <script src="http://yui.yahooapis.com/3.17.2/build/yui/yui-min.js">
    </script>
    "##);
  }

  #[test]
  fn chart_lists_every_key() {
    let html = make_chart("nbs.csv", &["main", "universe"], "chart");
    assert!(html.starts_with("<div id=\"chart\"></div>\n<script>\n"));
    assert!(html.contains("seriesKeys: [ \"main\", \"universe\" ],"));
    assert!(html.contains(r#""main": { line: { weight: "2mm" } }, "universe": { line: { weight: "2mm" } }"#));
    assert!(html.contains(r#"{key: "main", parser: parseNum}, {key: "universe", parser: parseNum}"#));
    assert!(html.contains(r#"resultDelimiter: "\n","#));
    assert!(html.contains(r#"var csv = new Y.DataSource.IO({source: "nbs.csv"});"#));
    assert!(html.contains("]}});"));
  }

  #[test]
  fn page_wraps_header_and_chart() {
    let page = render_page("NBS", "nbs.csv", &["count"]);
    assert!(page.starts_with("<!DOCTYPE html>\n<html>\n<head>\n"));
    assert!(page.contains("<title>NBS</title>\n<style type=\"text/css\">"));
    assert!(page.contains("</head>\n<body>\n<h1>NBS</h1>\n<div id=\"chart\"></div>"));
    assert!(page.ends_with("</script>\n</body>\n</html>\n"));
  }
}
