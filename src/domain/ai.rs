/// Canned reply draft for a ticket. There is no model behind it.
pub fn suggest_response(description: &str, comments: &[String]) -> String {
    let mut suggestion = format!(
        "Based on the ticket description \"{}\", I suggest checking the logs \
         first. If the issue persists, please restart the service.",
        description.trim()
    );
    match comments.len() {
        0 => {}
        1 => suggestion.push_str(
            " There is 1 earlier comment on this ticket; review it before \
             replying.",
        ),
        n => suggestion.push_str(&format!(
            " There are {n} earlier comments on this ticket; review them \
             before replying."
        )),
    }
    suggestion
}
