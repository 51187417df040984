use axum::response::Html;

const INDEX_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Marian MT</title></head>
<body>
<h1>Marian MT</h1>
<form id="translate">
  <input name="from" placeholder="en" size="4">
  <input name="to" placeholder="de" size="4">
  <br><textarea name="source" rows="8" cols="80"></textarea>
  <br><button type="submit">Translate</button>
</form>
<pre id="result"></pre>
<script>
document.getElementById("translate").addEventListener("submit", async (ev) => {
  ev.preventDefault();
  const form = new FormData(ev.target);
  const res = await fetch("/api/translate", {
    method: "POST",
    headers: {"Content-Type": "application/json"},
    body: JSON.stringify(Object.fromEntries(form)),
  });
  const body = await res.json();
  document.getElementById("result").textContent = body.translation ?? body.error;
});
</script>
</body>
</html>
"#;

pub async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}
