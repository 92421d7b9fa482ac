use super::{HelpBook, HelpFlag, HelpTopic, Section};

pub(crate) fn book() -> HelpBook<'static> {
    HelpBook {
        title: "folio: portfolio pages built from GitHub issues",
        usage: "folio <command> [options]",
        topics: ALL_TOPICS,
        footer: &["Use `folio help <topic>` for focused docs, e.g. `folio help build` or `folio help labels`."],
    }
}

const ALL_TOPICS: &[HelpTopic<'static>] = &[
    HelpTopic {
        name: "build",
        summary: "Fetch projects and notes and write the portfolio page.",
        usage: "folio build [--out PATH] [--section ID] [--filter SECTION=VALUE]...",
        details: &[
            "Fetches the \"project\" and \"note\" issue sets concurrently, renders one card per issue and writes a static HTML document.",
            "A section that fails to load, or has no issues, shows the built-in example set with a notice linking to the repository.",
            "Filters are applied after loading: project filters are all|code|audio|other, note filters are all or a zero-based month (0 = January).",
        ],
        flags: &[
            HelpFlag { name: "--out <path>", desc: "Output file (default $FOLIO_DIR/site/index.html)." },
            HelpFlag { name: "--section <id>", desc: "Initially visible section: home|projects|notes (default home)." },
            HelpFlag { name: "--filter <section=value>", desc: "Click a filter button, e.g. project=audio or note=11. Repeatable." },
        ],
        aliases: &["filters"],
        section: Section::Command,
        examples: &[
            "folio build",
            "folio build --out public/index.html --section projects --filter project=code",
        ],
    },
    HelpTopic {
        name: "list",
        summary: "List issues carrying a label, newest first.",
        usage: "folio list <project|note|label> [-t tag]... [--relative] [--plain]",
        details: &[
            "Rows show the issue number, creation date, title, other labels and a short excerpt of the body.",
            "Tag filters are case-insensitive and must all be present. On fetch failure the example set is listed and a warning goes to stderr.",
        ],
        flags: &[
            HelpFlag { name: "-t, --tag <tag>", desc: "Keep issues that also carry this label." },
            HelpFlag { name: "--relative, -r", desc: "Show age instead of the date." },
            HelpFlag { name: "--plain", desc: "Disable color." },
        ],
        aliases: &["ls"],
        section: Section::Command,
        examples: &["folio list project -t audio", "folio list note --relative"],
    },
    HelpTopic {
        name: "view",
        summary: "Show one issue by number.",
        usage: "folio view <project|note|label> <number> [--html] [--plain]",
        details: &[
            "Prints the title, date, labels and body. With --html prints the card markup used on the page instead.",
        ],
        flags: &[
            HelpFlag { name: "--html", desc: "Print the rendered card HTML." },
            HelpFlag { name: "--plain", desc: "Disable color." },
        ],
        aliases: &["show"],
        section: Section::Command,
        examples: &["folio view note 12", "folio view project 3 --html"],
    },
    HelpTopic {
        name: "render",
        summary: "Convert Markdown to sanitized HTML.",
        usage: "folio render [FILE|-]",
        details: &[
            "Reads FILE, or stdin when no file or \"-\" is given, and prints the sanitized HTML fragment.",
            "Supports headings, emphasis, fenced code, links, images, flat bullet lists, blockquotes and callouts (> [!NOTE], TIP, IMPORTANT, WARNING, CAUTION).",
        ],
        flags: &[],
        aliases: &[],
        section: Section::Command,
        examples: &["echo '**bold**' | folio render"],
    },
    HelpTopic {
        name: "note",
        summary: "Create a note issue, or print a pre-filled link without a token.",
        usage: "folio note <title> [body...] [-t tag]...",
        details: &[
            "With a token the issue is created with the \"note\" label plus any tags, and the cache is cleared.",
            "Without a token prints the repository's new-issue URL with the title, body and labels filled in.",
        ],
        flags: &[HelpFlag { name: "-t, --tag <tag>", desc: "Add a label. Repeatable." }],
        aliases: &["new"],
        section: Section::Command,
        examples: &["folio note \"Mixing notes\" low end first -t insights"],
    },
    HelpTopic {
        name: "token",
        summary: "Set, clear or inspect the stored GitHub token.",
        usage: "folio token set <value> | clear | status",
        details: &[
            "A token raises the API rate limit and enables `folio note`. Changing it clears the cache.",
            "FOLIO_TOKEN overrides the stored value.",
        ],
        flags: &[],
        aliases: &[],
        section: Section::Command,
        examples: &["folio token set ghp_example", "folio token status"],
    },
    HelpTopic {
        name: "cache",
        summary: "Inspect or clear cached API responses.",
        usage: "folio cache status | clear",
        details: &[
            "Responses are cached per query for FOLIO_CACHE_TTL seconds (default 300) in $FOLIO_DIR/cache.json.",
        ],
        flags: &[],
        aliases: &[],
        section: Section::Command,
        examples: &["folio cache clear"],
    },
    HelpTopic {
        name: "path",
        summary: "Print the data directory.",
        usage: "folio path",
        details: &[],
        flags: &[],
        aliases: &[],
        section: Section::Command,
        examples: &[],
    },
    HelpTopic {
        name: "help",
        summary: "Show this overview or a topic.",
        usage: "folio help [topic]",
        details: &[],
        flags: &[],
        aliases: &[],
        section: Section::Command,
        examples: &["folio help labels"],
    },
    HelpTopic {
        name: "FOLIO_DIR",
        summary: "Data directory for cache, settings and the built site (default ~/.folio).",
        usage: "FOLIO_DIR",
        details: &[],
        flags: &[],
        aliases: &[],
        section: Section::Environment,
        examples: &[],
    },
    HelpTopic {
        name: "FOLIO_OWNER / FOLIO_REPO",
        summary: "Repository the issues come from (default p0kks/p0kks.me).",
        usage: "FOLIO_OWNER, FOLIO_REPO",
        details: &[],
        flags: &[],
        aliases: &[],
        section: Section::Environment,
        examples: &[],
    },
    HelpTopic {
        name: "FOLIO_API_BASE / FOLIO_WEB_BASE",
        summary: "API and web base URLs (default https://api.github.com and https://github.com).",
        usage: "FOLIO_API_BASE, FOLIO_WEB_BASE",
        details: &[],
        flags: &[],
        aliases: &[],
        section: Section::Environment,
        examples: &[],
    },
    HelpTopic {
        name: "FOLIO_CACHE_TTL",
        summary: "Cache lifetime in seconds (default 300).",
        usage: "FOLIO_CACHE_TTL",
        details: &[],
        flags: &[],
        aliases: &[],
        section: Section::Environment,
        examples: &[],
    },
    HelpTopic {
        name: "FOLIO_TOKEN",
        summary: "Bearer token; overrides the stored one.",
        usage: "FOLIO_TOKEN",
        details: &[],
        flags: &[],
        aliases: &[],
        section: Section::Environment,
        examples: &[],
    },
    HelpTopic {
        name: "FOLIO_LOG",
        summary: "Log filter written to stderr, e.g. debug or folio=info (default warn).",
        usage: "FOLIO_LOG",
        details: &[],
        flags: &[],
        aliases: &[],
        section: Section::Environment,
        examples: &[],
    },
    HelpTopic {
        name: "labels",
        summary: "How issue labels become sections, categories and badges.",
        usage: "folio help labels",
        details: &[
            "Issues labelled \"project\" appear under Projects and issues labelled \"note\" under Notes.",
            "A project's category is the first of code, audio, other that it carries; anything else is \"other\". A note is grouped by the month it was opened.",
            "Every label except the section label is shown as a badge. Audio projects get a player for the first linked .mp3/.wav/.ogg/.m4a file; code projects list their fenced-code languages and GitHub links.",
        ],
        flags: &[],
        aliases: &["categories"],
        section: Section::Guide,
        examples: &[],
    },
];
