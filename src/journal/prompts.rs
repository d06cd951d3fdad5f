//! Prompt and reply text.

use chrono::NaiveDate;

pub const BOT_NAME: &str = "Journie";

pub const DEFAULT_REMINDER: &str = "Hi, take 5 minutes to write a journal entry!";

pub const UNSUPPORTED_PHOTO: &str = "Sorry! I am unable to process images as of now!";
pub const UNSUPPORTED_VIDEO: &str = "Sorry! I am unable to process videos as of now!";
pub const UNSUPPORTED_VOICE: &str = "Sorry! I am unable to process voice messages as of now!";

/// System instruction for a conversation opened on `today`.
pub fn system_instruction(today: NaiveDate) -> Vec<String> {
    vec![
        format!(
            "You are a journaling chatbot called {BOT_NAME}, respond to user with empathy \
             with a focus on how they are feeling."
        ),
        "Do not over ask too many questions. If you have asked 3 questions in a row, ask user \
         whether there is anything else they want to share for the day."
            .to_string(),
        "Make use of conversation history to make the chat engaging. Assume conversation \
         history is accurate"
            .to_string(),
        format!("Today is {}", today.format("%Y-%m-%d")),
    ]
}

const SUMMARY_INSTRUCTION: &str = r#"as a journaling chatbot called Journie, summarise chat session with input in the form of "Role" and "Parts". "Role" : "model" is you, the journalling chatbot and "Role": "user" is the user.  "Parts" describe the contents of the chat. summarise by providing an output in JSON with the following fields: "summary"and "mood". Address yourself as Journie. Address user as O

the field "summary" should not contain sensitive information like identification and contact information, user can be address as "user", names of other people mentioned in the chat session should have their name converted to initials with gender (M/F) in parenthesis if it is known. limit word count to 100 words.

the field "mood" can be defined as such: ["happy", "sad", "fear", "disgust", "anger", "surprise", "neutral"]. It should describe the mood of the user. limit to at most 2 moods. Declare mood in a comma separated array."#;

/// Worked (input, output) pairs shown before the real session.
const SUMMARY_EXAMPLES: &[(&str, &str)] = &[
    (
        r#"[{"Parts":["hi"],"Role":"user"},{"Parts":["Hello there! How can I assist you today?"],"Role":"model"},{"Parts":["im ng ping"],"Role":"user"},{"Parts":["Hello, Ng Ping! How can I help you today?"],"Role":"model"}]"#,
        r#"{"summary": "Journie greeted you, and asked how they could assist you.","mood": ["neutral"]}"#,
    ),
    (
        r#"[{"Parts":["hi"],"Role":"user"},{"Parts":["Hello there! How can I assist you today?"],"Role":"model"},{"Parts":["im ng ping, a guy"],"Role":"user"},{"Parts":["Hello, Ng Ping! How can I help you today?"],"Role":"model"}, {"Parts":["Hey Journie, i am pretty down today because Jenny Curran didnt want to go out with me"],"Role":"user"},{"Parts":["Im so sorry to hear that. What do you feel about this?"],"Role":"model"}]"#,
        r#"{"summary": "You are feeling down because JC(F) declined your invitation to go out.","mood": ["sad"]}"#,
    ),
    (
        r#"[{"Parts":["hi journie"],"Role":"user"},{"Parts":["Hi there! How are you feeling today? \n"],"Role":"model"},{"Parts":["its a mixed bag today"],"Role":"user"},{"Parts":["That's understandable, we all have those days. Would you like to share more about what's going on? \n"],"Role":"model"},{"Parts":["yea, i got the job which i applied for, which is great! but the offer is abit low, so im disappointed somewhat. but because i really like the company, i might must take up the offer"],"Role":"user"},{"Parts":["Wow, congratulations on the job! It's completely normal to feel disappointed when the offer is lower than you expected. It sounds like a tough decision.  Is there anything else on your mind? \n"],"Role":"model"},{"Parts":["nope, this took up my headspace for most of the day, going to sleep now"],"Role":"user"},{"Parts":["I hope you get a good night's rest. Sleep well and sweet dreams!\n"],"Role":"model"}]"#,
        r#"{"summary": "You shared with Journie that you have mixed feelings about your current situation. You received a job offer but the salary is below your expectation. Despite your disappointment, you are considering accepting the offer since you admire the company. Journie congratulated you and reassured you that it's okay to feel this way. You have decided to rest for the day.","mood": ["happy", "sad"]}"#,
    ),
    (
        r#"[{"Parts":["hi Journie"],"Role":"user"},{"Parts":["Hi there! How are you feeling today? \n"],"Role":"model"},{"Parts":["nothing eventful today, but i witnessed an uncle clearing his throat and spitting REPEATEDLY while i was having my lunch... i really think people like him should be shamed and named publicly."],"Role":"user"},{"Parts":["Ew, that sounds unpleasant. I understand why you would feel angry and disgusted by his behavior. Is there anything else you would like to share about what happened? \n"],"Role":"model"},{"Parts":["nah, thats all, ill just head to bed after watching tiktok for abit"],"Role":"user"},{"Parts":["Okay, I hope that watching Tiktok will help you relax and unwind after that unpleasant experience. Sleep well and have a good night!\n"],"Role":"model"}]"#,
        r#"{"summary": "You shared an unpleasant experience you witnessed with Journie. You expressed anger and disgust at an elderly man who repeatedly cleared his throat and spat in public while you were having lunch. Journie acknowledged your feelings and validated your reaction. You chose to end the conversation and relax by watching TikTok before going to bed.","mood": ["anger", "disgust"]}"#,
    ),
];

/// Few-shot prompt parts ending with the session to summarize.
pub fn summary_prompt(session_json: &str) -> Vec<String> {
    let mut parts = Vec::with_capacity(SUMMARY_EXAMPLES.len() * 2 + 3);
    parts.push(SUMMARY_INSTRUCTION.to_string());
    for (input, output) in SUMMARY_EXAMPLES {
        parts.push(format!("input: {input}"));
        parts.push(format!("output: {output}"));
    }
    parts.push(format!("input: {session_json}"));
    parts.push("output: ".to_string());
    parts
}

pub fn welcome(username: &str) -> String {
    format!(
        "Hi there {username}!\n\n\
         Welcome to {BOT_NAME}, your private and engaging journaling companion.\n\n\
         Here, you can chat with a friendly genie who remembers your past entries and helps \
         you explore your thoughts and feelings.\n\n\
         Simply say Hi and we can begin!"
    )
}
